//! Step module.
//!
//! Contains the step registry and built-in step implementations.

pub mod registry;
pub mod builtin;

pub use registry::{RegistryBuilder, StepInfo, StepRegistry};
