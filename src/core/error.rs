//! Error types for pixelchain.
//!
//! Uses thiserror for structured errors. Pipeline errors are serializable so a
//! serving layer can forward them as-is, and always name the failing step by
//! position and name.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for pixelchain.
///
/// Covers the core plus the file, data URL and settings adapters around it.
#[derive(Error, Debug)]
pub enum PixelchainError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while registering or looking up steps.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryError {
    #[error("Step '{0}' is already registered")]
    DuplicateStep(String),

    #[error("Unknown step '{0}'")]
    UnknownStep(String),
}

/// Errors raised by a single step, before the runner attaches its position.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepError {
    #[error("invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("{0}")]
    Execution(String),
}

/// Errors from validating or executing a pipeline.
///
/// `index` is the zero-based position of the failing entry.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("Step {index}: unknown step '{step}'")]
    UnknownStep { index: usize, step: String },

    #[error("Step {index} ('{step}'): invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        index: usize,
        step: String,
        parameter: String,
        reason: String,
    },

    #[error("Step {index} ('{step}') failed: {reason}")]
    StepExecution {
        index: usize,
        step: String,
        reason: String,
    },
}

/// Errors from building an [`ImageBuffer`](crate::core::types::ImageBuffer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(u8),

    #[error("Sample buffer has {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

// ============================================================================
// Error Utilities
// ============================================================================

impl StepError {
    /// Shorthand for an invalid parameter error.
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        StepError::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an execution error.
    pub fn execution(reason: impl Into<String>) -> Self {
        StepError::Execution(reason.into())
    }

    /// Attach the position of a step that failed while being validated.
    pub fn at_validation(self, index: usize, step: &str) -> PipelineError {
        match self {
            StepError::InvalidParameter { parameter, reason } => PipelineError::InvalidParameter {
                index,
                step: step.to_string(),
                parameter,
                reason,
            },
            StepError::Execution(reason) => PipelineError::StepExecution {
                index,
                step: step.to_string(),
                reason,
            },
        }
    }

    /// Attach the position of a step that failed while running.
    pub fn at_execution(self, index: usize, step: &str) -> PipelineError {
        PipelineError::StepExecution {
            index,
            step: step.to_string(),
            reason: self.to_string(),
        }
    }
}

impl From<BufferError> for StepError {
    fn from(err: BufferError) -> Self {
        StepError::Execution(err.to_string())
    }
}

impl From<image::ImageError> for StepError {
    fn from(err: image::ImageError) -> Self {
        StepError::Execution(err.to_string())
    }
}

impl PipelineError {
    /// Position of the failing entry.
    pub fn index(&self) -> usize {
        match self {
            PipelineError::UnknownStep { index, .. }
            | PipelineError::InvalidParameter { index, .. }
            | PipelineError::StepExecution { index, .. } => *index,
        }
    }

    /// Name of the failing step as written in the pipeline.
    pub fn step(&self) -> &str {
        match self {
            PipelineError::UnknownStep { step, .. }
            | PipelineError::InvalidParameter { step, .. }
            | PipelineError::StepExecution { step, .. } => step,
        }
    }

    /// Whether the failure was detected before any step ran.
    pub fn is_validation(&self) -> bool {
        !matches!(self, PipelineError::StepExecution { .. })
    }

    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            PipelineError::UnknownStep { step, .. } => Some(format!(
                "Replace '{}' with one of the registered steps (see `pixelchain list`)",
                step
            )),
            PipelineError::InvalidParameter { parameter, reason, .. } => {
                Some(format!("Adjust '{}': {}", parameter, reason))
            }
            PipelineError::StepExecution { .. } => None,
        }
    }
}

/// Result type alias for pixelchain operations.
pub type PixelchainResult<T> = Result<T, PixelchainError>;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for step operations.
pub type StepResult<T> = Result<T, StepError>;

// ============================================================================
// Validation Report
// ============================================================================

/// Every problem found in a pipeline, rather than just the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether validation passed without errors.
    pub success: bool,
    /// List of errors found, in pipeline order.
    pub errors: Vec<PipelineError>,
    /// Time taken for validation in milliseconds.
    pub duration_ms: u64,
}

impl ValidationReport {
    /// Create a new empty report (success).
    pub fn new() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Add an error to the report.
    pub fn add_error(&mut self, error: PipelineError) {
        self.success = false;
        self.errors.push(error);
    }

    /// Check if the pipeline can be executed.
    pub fn can_execute(&self) -> bool {
        self.success
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.success {
            "✓ Pipeline is valid and ready to run".to_string()
        } else {
            format!("✗ Validation failed with {} error(s)", self.errors.len())
        }
    }

    /// Get detailed error messages with suggestions.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .enumerate()
            .map(|(i, error)| {
                let mut msg = format!("{}. {}", i + 1, error);
                if let Some(fix) = error.suggested_fix() {
                    msg.push_str(&format!("\n   → Suggestion: {}", fix));
                }
                msg
            })
            .collect()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_positions() {
        let err = StepError::invalid("factor", "must be finite").at_validation(2, "brightness");
        assert_eq!(
            err,
            PipelineError::InvalidParameter {
                index: 2,
                step: "brightness".to_string(),
                parameter: "factor".to_string(),
                reason: "must be finite".to_string(),
            }
        );
        assert!(err.is_validation());

        let err = StepError::execution("out of bounds").at_execution(1, "crop");
        assert_eq!(err.index(), 1);
        assert_eq!(err.step(), "crop");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_pipeline_error_serializes_with_kind() {
        let err = PipelineError::UnknownStep {
            index: 1,
            step: "sepia".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "unknown_step");
        assert_eq!(json["index"], 1);
        assert_eq!(json["step"], "sepia");
    }

    #[test]
    fn test_suggestions() {
        let err = PipelineError::UnknownStep {
            index: 0,
            step: "sepia".to_string(),
        };
        assert!(err.suggested_fix().unwrap().contains("sepia"));
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();
        assert!(report.can_execute());

        report.add_error(PipelineError::UnknownStep {
            index: 0,
            step: "x".to_string(),
        });
        assert!(!report.can_execute());
        assert_eq!(report.detailed_errors().len(), 1);
    }
}
