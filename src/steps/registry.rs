//! Step registry for managing available step types.

use crate::core::error::RegistryError;
use crate::core::param::ParameterDefinition;
use crate::core::step::{Category, Step, StepMetadata};
use crate::core::types::{ParamType, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Registry entry containing the step and its metadata.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Shared step implementation.
    pub step: Arc<dyn Step>,
    /// Cached metadata (avoids rebuilding it on every lookup).
    pub metadata: StepMetadata,
}

/// Registry for all available step types.
///
/// Maps step names to implementations, in registration order. A registry is
/// filled during setup and only read afterwards, so it can be shared freely
/// between concurrent runs.
pub struct StepRegistry {
    /// Steps indexed by their unique name.
    steps: IndexMap<String, RegistryEntry>,
}

impl StepRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            steps: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in steps.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::steps::builtin::register_all(&mut registry);
        registry
    }

    /// The process-wide registry of built-in steps, created on first use.
    pub fn global() -> &'static StepRegistry {
        static REGISTRY: OnceLock<StepRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let registry = Self::with_builtins();
            log::debug!("Initialized step registry with {} steps", registry.len());
            registry
        })
    }

    /// Register a step under the name in its metadata.
    pub fn register<S: Step + 'static>(&mut self, step: S) -> Result<(), RegistryError> {
        let step: Arc<dyn Step> = Arc::new(step);
        let name = step.metadata().name;
        self.register_named(name, step)
    }

    /// Register a step under an explicit name.
    ///
    /// Fails if the name is already taken; existing entries are never replaced.
    pub fn register_named(
        &mut self,
        name: impl Into<String>,
        step: Arc<dyn Step>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.steps.contains_key(&name) {
            return Err(RegistryError::DuplicateStep(name));
        }
        self.insert(name, step);
        Ok(())
    }

    /// Insert without the duplicate check. Only used for the built-in set,
    /// whose names are distinct.
    pub(crate) fn insert(&mut self, name: String, step: Arc<dyn Step>) {
        let metadata = step.metadata();
        log::trace!("Registering step '{}'", name);
        self.steps.insert(name, RegistryEntry { step, metadata });
    }

    /// Look up a step by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Step>, RegistryError> {
        self.steps
            .get(name)
            .map(|entry| Arc::clone(&entry.step))
            .ok_or_else(|| RegistryError::UnknownStep(name.to_string()))
    }

    /// Get metadata for a step.
    pub fn get_metadata(&self, name: &str) -> Option<&StepMetadata> {
        self.steps.get(name).map(|e| &e.metadata)
    }

    /// Check if a step is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Get all registered step names, in registration order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(|s| s.as_str())
    }

    /// Get all registered steps with their metadata, in registration order.
    pub fn steps(&self) -> impl Iterator<Item = (&str, &StepMetadata)> {
        self.steps.iter().map(|(k, v)| (k.as_str(), &v.metadata))
    }

    /// Get step names in a category.
    pub fn steps_by_category(&self, category: Category) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|(_, e)| e.metadata.category == category)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Describe every registered step in a serializable form.
    pub fn list_steps(&self) -> Vec<StepInfo> {
        self.steps
            .iter()
            .map(|(name, entry)| StepInfo::new(name, &entry.metadata))
            .collect()
    }

    /// Get the total number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ============================================================================
// Step Listing
// ============================================================================

/// Serializable description of a step, for callers that render parameter
/// forms or document the available steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepInfo {
    /// Name used in pipelines.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Category for grouping.
    pub category: Category,
    /// One-line description.
    pub description: String,
    /// Parameter schema, in declaration order.
    pub parameters: Vec<ParameterInfo>,
}

/// Serializable description of one parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterInfo {
    /// Parameter name.
    pub name: String,
    /// Semantic type ("int" or "float").
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Description.
    pub description: String,
    /// Value used when omitted.
    pub default: Value,
    /// Inclusive lower bound, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Inclusive upper bound, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl StepInfo {
    fn new(name: &str, metadata: &StepMetadata) -> Self {
        Self {
            name: name.to_string(),
            display_name: metadata.display_name.clone(),
            category: metadata.category,
            description: metadata.description.clone(),
            parameters: metadata.parameters.iter().map(ParameterInfo::from).collect(),
        }
    }
}

impl From<&ParameterDefinition> for ParameterInfo {
    fn from(def: &ParameterDefinition) -> Self {
        Self {
            name: def.name.clone(),
            param_type: def.param_type,
            description: def.description.clone(),
            default: def.default_value.clone(),
            min_value: def.min_value(),
            max_value: def.max_value(),
        }
    }
}

// ============================================================================
// Registry Builder
// ============================================================================

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    custom: Vec<Arc<dyn Step>>,
    include_builtins: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            include_builtins: true,
        }
    }

    /// Include or exclude built-in steps.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Register a custom step.
    pub fn register<S: Step + 'static>(mut self, step: S) -> Self {
        self.custom.push(Arc::new(step));
        self
    }

    /// Build the registry, failing if two steps share a name.
    pub fn build(self) -> Result<StepRegistry, RegistryError> {
        let mut registry = StepRegistry::new();
        if self.include_builtins {
            crate::steps::builtin::register_all(&mut registry);
        }
        for step in self.custom {
            let name = step.metadata().name;
            registry.register_named(name, step)?;
        }
        Ok(registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Parameters;
    use crate::core::error::StepError;
    use crate::core::types::ImageBuffer;

    struct Identity;

    impl Step for Identity {
        fn metadata(&self) -> StepMetadata {
            StepMetadata::builder("identity", "Identity")
                .category(Category::Custom)
                .description("Returns the image unchanged")
                .build()
        }

        fn apply(&self, image: &ImageBuffer, _params: &Parameters) -> Result<ImageBuffer, StepError> {
            Ok(image.clone())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = StepRegistry::new();
        registry.register(Identity).unwrap();

        assert!(registry.contains("identity"));
        assert!(registry.resolve("identity").is_ok());
        assert_eq!(registry.get_metadata("identity").unwrap().display_name, "Identity");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = StepRegistry::new();
        registry.register(Identity).unwrap();
        assert_eq!(
            registry.register(Identity),
            Err(RegistryError::DuplicateStep("identity".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_step() {
        let registry = StepRegistry::new();
        assert!(matches!(
            registry.resolve("sepia"),
            Err(RegistryError::UnknownStep(name)) if name == "sepia"
        ));
    }

    #[test]
    fn test_builtins_in_order() {
        let registry = StepRegistry::with_builtins();
        let names: Vec<_> = registry.step_names().collect();
        assert_eq!(
            names,
            vec!["brightness", "saturation", "hue", "boxblur", "unsharpmask", "crop", "rotate"]
        );
        assert_eq!(registry.steps_by_category(Category::Transform), vec!["crop", "rotate"]);
    }

    #[test]
    fn test_global_is_shared() {
        let a = StepRegistry::global() as *const StepRegistry;
        let b = StepRegistry::global() as *const StepRegistry;
        assert_eq!(a, b);
        assert_eq!(StepRegistry::global().len(), 7);
    }

    #[test]
    fn test_list_steps_shape() {
        let registry = StepRegistry::with_builtins();
        let steps = registry.list_steps();
        let crop = steps.iter().find(|s| s.name == "crop").unwrap();
        let width = crop.parameters.iter().find(|p| p.name == "width").unwrap();
        assert_eq!(width.default, Value::Integer(100));
        assert_eq!(width.min_value, Some(1.0));

        let json = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(json["name"], "brightness");
        assert_eq!(json["parameters"][0]["type"], "float");
        assert_eq!(json["parameters"][0]["default"], 1.0);
        assert!(json["parameters"][0].get("min_value").is_none());
    }

    #[test]
    fn test_builder() {
        let registry = RegistryBuilder::new()
            .with_builtins(false)
            .register(Identity)
            .build()
            .unwrap();
        assert_eq!(registry.len(), 1);

        let registry = RegistryBuilder::new().register(Identity).build().unwrap();
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_builder_rejects_clash_with_builtin() {
        struct FakeCrop;
        impl Step for FakeCrop {
            fn metadata(&self) -> StepMetadata {
                StepMetadata::builder("crop", "Fake Crop").build()
            }
            fn apply(&self, image: &ImageBuffer, _: &Parameters) -> Result<ImageBuffer, StepError> {
                Ok(image.clone())
            }
        }
        let result = RegistryBuilder::new().register(FakeCrop).build();
        assert!(matches!(result, Err(RegistryError::DuplicateStep(name)) if name == "crop"));
    }
}
