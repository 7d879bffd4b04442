//! Pipeline definitions, as supplied by callers and after validation.
//!
//! A [`PipelineDefinition`] is the request-scoped list of step invocations,
//! serialized as `[{"step": "brightness", "params": {"factor": 1.2}}]`.
//! Validating it produces a [`NormalizedPipeline`] whose entries hold the
//! resolved step and a complete parameter set.

use crate::core::context::Parameters;
use crate::core::step::Step;
use crate::core::types::{Dimensions, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One entry of a pipeline: a step name and possibly partial parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInvocation {
    /// Registered step name.
    pub step: String,
    /// Supplied parameters; omitted ones take their defaults.
    #[serde(default)]
    pub params: IndexMap<String, Value>,
}

impl StepInvocation {
    /// Invoke a step with all-default parameters.
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            params: IndexMap::new(),
        }
    }

    /// Set one parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Ordered list of step invocations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineDefinition {
    steps: Vec<StepInvocation>,
}

impl PipelineDefinition {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step (builder style).
    pub fn then(mut self, invocation: StepInvocation) -> Self {
        self.steps.push(invocation);
        self
    }

    /// Append a step.
    pub fn push(&mut self, invocation: StepInvocation) {
        self.steps.push(invocation);
    }

    /// Parse the JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StepInvocation> {
        self.steps.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pipeline has no entries.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<StepInvocation> for PipelineDefinition {
    fn from_iter<I: IntoIterator<Item = StepInvocation>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PipelineDefinition {
    type Item = &'a StepInvocation;
    type IntoIter = std::slice::Iter<'a, StepInvocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

// ============================================================================
// Normalized Pipeline
// ============================================================================

/// A validated pipeline entry.
#[derive(Clone)]
pub struct NormalizedStep {
    /// Step name as written in the definition.
    pub name: String,
    /// Resolved implementation.
    pub step: Arc<dyn Step>,
    /// Complete, coerced parameters.
    pub parameters: Parameters,
    /// Predicted input dimensions, when validation knew them.
    pub input: Option<Dimensions>,
    /// Predicted output dimensions, when validation knew the input.
    pub output: Option<Dimensions>,
}

impl fmt::Debug for NormalizedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedStep")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

/// A pipeline that passed validation and can be executed.
#[derive(Debug, Clone, Default)]
pub struct NormalizedPipeline {
    steps: Vec<NormalizedStep>,
}

impl NormalizedPipeline {
    pub(crate) fn new(steps: Vec<NormalizedStep>) -> Self {
        Self { steps }
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedStep> {
        self.steps.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pipeline has no entries.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Predicted dimensions of the final image, when known.
    pub fn output_dimensions(&self) -> Option<Dimensions> {
        self.steps.last().and_then(|s| s.output)
    }

    /// Turn back into a definition carrying the normalized parameters.
    pub fn to_definition(&self) -> PipelineDefinition {
        self.steps
            .iter()
            .map(|s| StepInvocation {
                step: s.name.clone(),
                params: s.parameters.as_map().clone(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a NormalizedPipeline {
    type Item = &'a NormalizedStep;
    type IntoIter = std::slice::Iter<'a, NormalizedStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
