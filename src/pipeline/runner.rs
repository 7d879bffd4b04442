//! Pipeline runner: validates pipeline definitions and executes them.
//!
//! Validation is a single atomic pass over the whole definition, so no step
//! runs unless every entry resolves and every parameter set is valid.
//! Execution then applies the steps strictly in order, threading the image
//! from one to the next.

use crate::core::context::ValidationContext;
use crate::core::error::{PipelineError, ValidationReport};
use crate::core::types::{Dimensions, ImageBuffer};
use crate::pipeline::definition::{NormalizedPipeline, NormalizedStep, PipelineDefinition};
use crate::pipeline::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::steps::registry::StepRegistry;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Run options.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl RunOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }
}

/// Timing for one executed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    /// Position in the pipeline.
    pub index: usize,
    /// Step name.
    pub step: String,
    /// Time spent in `apply`.
    pub duration: Duration,
}

/// Execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Total execution time.
    pub total_duration: Duration,
    /// Number of steps executed.
    pub steps_executed: usize,
    /// Per-step timings, in order.
    pub step_timings: Vec<StepTiming>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The final image.
    pub image: ImageBuffer,
    /// Execution statistics.
    pub stats: ExecutionStats,
}

/// Validates and executes pipelines against a step registry.
pub struct PipelineRunner<'r> {
    registry: &'r StepRegistry,
    options: RunOptions,
}

impl PipelineRunner<'static> {
    /// Runner over the process-wide registry of built-in steps.
    pub fn global() -> Self {
        Self::new(StepRegistry::global())
    }
}

impl<'r> PipelineRunner<'r> {
    /// Create a runner over a registry.
    pub fn new(registry: &'r StepRegistry) -> Self {
        Self {
            registry,
            options: RunOptions::default(),
        }
    }

    /// Set run options.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// The registry steps are resolved against.
    pub fn registry(&self) -> &StepRegistry {
        self.registry
    }

    /// Resolve every entry and normalize its parameters.
    ///
    /// When `input` is given, predicted dimensions are threaded through the
    /// pipeline so size-dependent rules (crop bounds) are checked up front.
    /// Stops at the first failing entry.
    pub fn validate(
        &self,
        definition: &PipelineDefinition,
        input: Option<Dimensions>,
    ) -> Result<NormalizedPipeline, PipelineError> {
        let mut steps = Vec::with_capacity(definition.len());
        let mut dims = input;

        for (index, invocation) in definition.iter().enumerate() {
            let normalized = self.validate_entry(index, invocation, dims)?;
            dims = normalized.output;
            steps.push(normalized);
        }

        log::debug!("Validated pipeline of {} step(s)", steps.len());
        Ok(NormalizedPipeline::new(steps))
    }

    /// Validate every entry and collect all problems instead of stopping at
    /// the first. Dimensions stop being threaded after a failing entry.
    pub fn check(&self, definition: &PipelineDefinition, input: Option<Dimensions>) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();
        let mut dims = input;

        for (index, invocation) in definition.iter().enumerate() {
            match self.validate_entry(index, invocation, dims) {
                Ok(normalized) => dims = normalized.output,
                Err(err) => {
                    report.add_error(err);
                    dims = None;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    fn validate_entry(
        &self,
        index: usize,
        invocation: &crate::pipeline::definition::StepInvocation,
        input: Option<Dimensions>,
    ) -> Result<NormalizedStep, PipelineError> {
        let name = invocation.step.as_str();
        let step = self
            .registry
            .resolve(name)
            .map_err(|_| PipelineError::UnknownStep {
                index,
                step: name.to_string(),
            })?;

        let ctx = ValidationContext::new(&invocation.params).with_input(input);
        let parameters = step
            .validate(&ctx)
            .map_err(|err| err.at_validation(index, name))?;

        let output = match input {
            Some(dims) => Some(
                step.output_dimensions(dims, &parameters)
                    .map_err(|err| err.at_validation(index, name))?,
            ),
            None => None,
        };

        Ok(NormalizedStep {
            name: name.to_string(),
            step,
            parameters,
            input,
            output,
        })
    }

    /// Apply every step in order.
    ///
    /// The first failing step halts the run; no partial image is returned.
    pub fn execute(
        &self,
        image: ImageBuffer,
        pipeline: &NormalizedPipeline,
    ) -> Result<RunOutput, PipelineError> {
        let start = Instant::now();
        let mut tracker =
            ProgressTracker::new(pipeline.len()).with_callback(self.options.progress_callback.clone());
        tracker.start();

        let mut stats = ExecutionStats::default();
        let mut current = image;

        for (index, entry) in pipeline.iter().enumerate() {
            tracker.step_started(index, &entry.name);
            let step_start = Instant::now();

            current = match Self::execute_step(index, entry, &current) {
                Ok(next) => next,
                Err(err) => {
                    tracker.failed(index, &entry.name, err.to_string());
                    return Err(err);
                }
            };

            let duration = step_start.elapsed();
            log::debug!(
                "Step {} ('{}') produced {} in {:?}",
                index,
                entry.name,
                current.dimensions(),
                duration
            );
            tracker.step_completed(index, &entry.name, duration);
            stats.steps_executed += 1;
            stats.step_timings.push(StepTiming {
                index,
                step: entry.name.clone(),
                duration,
            });
        }

        stats.total_duration = start.elapsed();
        tracker.complete();

        Ok(RunOutput {
            image: current,
            stats,
        })
    }

    fn execute_step(
        index: usize,
        entry: &NormalizedStep,
        input: &ImageBuffer,
    ) -> Result<ImageBuffer, PipelineError> {
        log::trace!("Running step {} ('{}') on {}", index, entry.name, input.dimensions());
        let output = entry
            .step
            .apply(input, &entry.parameters)
            .map_err(|err| err.at_execution(index, &entry.name))?;

        let declared = entry
            .step
            .output_dimensions(input.dimensions(), &entry.parameters)
            .map_err(|err| err.at_execution(index, &entry.name))?;

        if output.dimensions() != declared {
            return Err(PipelineError::StepExecution {
                index,
                step: entry.name.clone(),
                reason: format!(
                    "produced a {} image but declared {}",
                    output.dimensions(),
                    declared
                ),
            });
        }
        Ok(output)
    }

    /// Validate against the image's dimensions, then execute.
    pub fn run(
        &self,
        image: ImageBuffer,
        definition: &PipelineDefinition,
    ) -> Result<RunOutput, PipelineError> {
        let pipeline = self.validate(definition, Some(image.dimensions()))?;
        self.execute(image, &pipeline)
    }

    /// Execute one pipeline over many images in parallel.
    ///
    /// Each run is independent and sequential internally. Results are in the
    /// same order as `images`.
    pub fn run_many(
        &self,
        images: Vec<ImageBuffer>,
        pipeline: &NormalizedPipeline,
    ) -> Vec<Result<RunOutput, PipelineError>> {
        images
            .into_par_iter()
            .map(|image| self.execute(image, pipeline))
            .collect()
    }
}
