//! Pipeline module.
//!
//! Pipeline definitions, the runner that validates and executes them, and
//! progress reporting for runs.

pub mod definition;
pub mod progress;
pub mod runner;

pub use definition::{NormalizedPipeline, NormalizedStep, PipelineDefinition, StepInvocation};
pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
pub use runner::{ExecutionStats, PipelineRunner, RunOptions, RunOutput, StepTiming};
