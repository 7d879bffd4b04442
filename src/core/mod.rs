//! Core types and traits for the pixelchain pipeline engine.
//!
//! This module contains the foundational types every step and the runner
//! build on:
//! - Parameter values and the image buffer
//! - Parameter definitions and constraints
//! - The Step trait and step metadata
//! - Error types
//! - The validation context

pub mod types;
pub mod param;
pub mod error;
pub mod context;
pub mod step;

// Re-export commonly used types
pub use types::{Dimensions, ImageBuffer, ParamType, Value};
pub use param::{Constraint, ParameterDefinition};
pub use error::{BufferError, PipelineError, PixelchainError, RegistryError, StepError};
pub use context::{Parameters, ValidationContext};
pub use step::{Category, Step, StepMetadata};
