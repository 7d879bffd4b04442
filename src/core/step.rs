//! The Step trait and step metadata.
//!
//! A step is a single, named, parameterized image transformation. Like every
//! stage in this crate it works in two phases: `validate` turns whatever the
//! caller supplied into a complete parameter set before anything runs, and
//! `apply` transforms one image with those parameters.

use crate::core::context::{Parameters, ValidationContext};
use crate::core::error::StepError;
use crate::core::param::ParameterDefinition;
use crate::core::types::{Dimensions, ImageBuffer};
use serde::{Deserialize, Serialize};

/// Category for grouping steps in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Colour adjustments (brightness, saturation, hue)
    Color,
    /// Blur effects
    Blur,
    /// Sharpening effects
    Sharpen,
    /// Geometric transformations (crop, rotate)
    Transform,
    /// Custom/user-defined
    #[default]
    Custom,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Color => "Color",
            Category::Blur => "Blur",
            Category::Sharpen => "Sharpen",
            Category::Transform => "Transform",
            Category::Custom => "Custom",
        }
    }
}

/// Metadata describing a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepMetadata {
    /// Unique identifier used in pipelines (e.g., "boxblur")
    pub name: String,
    /// Human-readable name (e.g., "Box Blur")
    pub display_name: String,
    /// Category for grouping
    pub category: Category,
    /// One-line description
    pub description: String,
    /// Ordered parameter schema
    pub parameters: Vec<ParameterDefinition>,
}

impl StepMetadata {
    /// Create a new metadata builder.
    pub fn builder(name: impl Into<String>, display_name: impl Into<String>) -> StepMetadataBuilder {
        StepMetadataBuilder::new(name, display_name)
    }

    /// Get all parameter names.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Find a parameter by name.
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Builder for StepMetadata.
pub struct StepMetadataBuilder {
    name: String,
    display_name: String,
    category: Category,
    description: String,
    parameters: Vec<ParameterDefinition>,
}

impl StepMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            category: Category::Custom,
            description: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a parameter.
    pub fn parameter(mut self, param: ParameterDefinition) -> Self {
        self.parameters.push(param);
        self
    }

    /// Build the metadata.
    pub fn build(self) -> StepMetadata {
        StepMetadata {
            name: self.name,
            display_name: self.display_name,
            category: self.category,
            description: self.description,
            parameters: self.parameters,
        }
    }
}

/// The core trait for pipeline steps.
///
/// # Contract
///
/// - `validate` is called once per pipeline entry before any step runs. The
///   default implementation fills defaults, coerces types, checks
///   constraints and rejects unknown names. Steps with extra rules override
///   it and usually start from [`ValidationContext::normalize`]. Validating
///   an already-normalized set must return it unchanged.
/// - `apply` is pure: it never mutates its input and gives the same output
///   for the same input and parameters.
/// - `output_dimensions` must agree with what `apply` produces; the runner
///   checks this after every step.
///
/// # Example Implementation
///
/// ```ignore
/// struct Invert;
///
/// impl Step for Invert {
///     fn metadata(&self) -> StepMetadata {
///         StepMetadata::builder("invert", "Invert")
///             .category(Category::Color)
///             .description("Invert every colour sample")
///             .build()
///     }
///
///     fn apply(&self, image: &ImageBuffer, _params: &Parameters) -> Result<ImageBuffer, StepError> {
///         let colors = image.color_channels();
///         Ok(image.map_pixels(|px| px[..colors].iter_mut().for_each(|s| *s = 255 - *s)))
///     }
/// }
/// ```
pub trait Step: Send + Sync {
    /// Get the metadata for this step.
    fn metadata(&self) -> StepMetadata;

    /// Produce normalized parameters from the caller's (possibly partial) set.
    fn validate(&self, ctx: &ValidationContext) -> Result<Parameters, StepError> {
        ctx.normalize(&self.metadata().parameters)
    }

    /// Transform an image. Parameters are always the output of `validate`.
    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError>;

    /// Dimensions `apply` will produce for an input of the given dimensions.
    fn output_dimensions(
        &self,
        input: Dimensions,
        _params: &Parameters,
    ) -> Result<Dimensions, StepError> {
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;
    use indexmap::IndexMap;

    struct Invert;

    impl Step for Invert {
        fn metadata(&self) -> StepMetadata {
            StepMetadata::builder("invert", "Invert")
                .category(Category::Color)
                .parameter(ParameterDefinition::float("strength", 1.0))
                .build()
        }

        fn apply(&self, image: &ImageBuffer, _params: &Parameters) -> Result<ImageBuffer, StepError> {
            let colors = image.color_channels();
            Ok(image.map_pixels(|px| px[..colors].iter_mut().for_each(|s| *s = 255 - *s)))
        }
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = StepMetadata::builder("test_step", "Test Step")
            .category(Category::Blur)
            .description("A test step")
            .parameter(ParameterDefinition::integer("radius", 1))
            .build();

        assert_eq!(metadata.name, "test_step");
        assert_eq!(metadata.display_name, "Test Step");
        assert_eq!(metadata.category, Category::Blur);
        assert_eq!(metadata.parameter_names(), vec!["radius"]);
        assert!(metadata.get_parameter("radius").is_some());
    }

    #[test]
    fn test_default_validate_and_dimensions() {
        let supplied = IndexMap::new();
        let params = Invert.validate(&ValidationContext::new(&supplied)).unwrap();
        assert_eq!(params.get("strength").unwrap(), &Value::Float(1.0));

        let dims = Dimensions::new(5, 4, 4);
        assert_eq!(Invert.output_dimensions(dims, &params).unwrap(), dims);
    }

    #[test]
    fn test_apply_leaves_alpha() {
        let image = ImageBuffer::filled(2, 2, &[10, 20, 30, 40]).unwrap();
        let out = Invert.apply(&image, &Parameters::new()).unwrap();
        assert_eq!(out.pixel(1, 1), &[245, 235, 225, 40]);
        assert_eq!(image.pixel(1, 1), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Blur.display_name(), "Blur");
        assert_eq!(Category::default(), Category::Custom);
    }
}
