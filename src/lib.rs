//! # Pixelchain - Ordered Image Processing Pipelines
//!
//! Pixelchain applies an ordered list of parameterized image operations
//! ("steps") to an image. Pipelines are validated as a whole before anything
//! runs, so a bad step name or parameter is reported by position without
//! touching the image.
//!
//! ## Features
//!
//! - **Step Registry**: Built-in colour, blur, sharpen and geometric steps, looked up by name
//! - **Validated Parameters**: Defaults, type coercion and range checks per step
//! - **Atomic Validation**: Every entry is checked before the first step runs
//! - **Parallel Kernels**: Per-pixel work and batch runs use rayon
//! - **Extensible**: Add custom steps through the [`Step`](core::Step) trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pixelchain::prelude::*;
//!
//! let pipeline = PipelineDefinition::from_json(r#"[
//!     {"step": "brightness", "params": {"factor": 1.2}},
//!     {"step": "boxblur", "params": {"radius": 2}},
//!     {"step": "rotate", "params": {"degrees": 90}}
//! ]"#)?;
//!
//! let image = pixelchain::codec::load_image("input.png")?;
//! let output = PipelineRunner::global().run(image, &pipeline)?;
//! pixelchain::codec::save_image(&output.image, "output.png", 85)?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Values, image buffer, parameter definitions, the Step trait, errors
//! - [`steps`]: Step registry and built-in steps
//! - [`pipeline`]: Pipeline definitions, validation and execution
//! - [`codec`]: File and data URL encoding
//! - [`config`]: Settings for the command-line tool
//!
//! ## Creating Custom Steps
//!
//! ```rust,ignore
//! use pixelchain::prelude::*;
//!
//! struct Invert;
//!
//! impl Step for Invert {
//!     fn metadata(&self) -> StepMetadata {
//!         StepMetadata::builder("invert", "Invert")
//!             .category(Category::Color)
//!             .description("Invert colour channels")
//!             .build()
//!     }
//!
//!     fn apply(&self, image: &ImageBuffer, _: &Parameters) -> Result<ImageBuffer, StepError> {
//!         let colors = image.color_channels();
//!         Ok(image.map_pixels(|px| px[..colors].iter_mut().for_each(|v| *v = 255 - *v)))
//!     }
//! }
//!
//! let registry = RegistryBuilder::new().register(Invert).build()?;
//! let runner = PipelineRunner::new(&registry);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod steps;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use pixelchain::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{Dimensions, ImageBuffer, ParamType, Value};

    // Step trait and metadata
    pub use crate::core::step::{Category, Step, StepMetadata};

    // Parameter definitions
    pub use crate::core::param::{Constraint, ParameterDefinition};

    // Contexts
    pub use crate::core::context::{Parameters, ValidationContext};

    // Errors
    pub use crate::core::error::{
        BufferError, PipelineError, PixelchainError, RegistryError, StepError, ValidationReport,
    };

    // Pipeline
    pub use crate::pipeline::definition::{
        NormalizedPipeline, NormalizedStep, PipelineDefinition, StepInvocation,
    };
    pub use crate::pipeline::progress::{ProgressCallback, ProgressUpdate};
    pub use crate::pipeline::runner::{ExecutionStats, PipelineRunner, RunOptions, RunOutput};

    // Registry
    pub use crate::steps::registry::{ParameterInfo, RegistryBuilder, StepInfo, StepRegistry};

    // Built-in steps
    pub use crate::steps::builtin::{
        // Color
        Brightness, Hue, Saturation,
        // Blur and sharpen
        BoxBlur, UnsharpMask,
        // Transform
        Crop, Rotate,
    };
}

use crate::core::error::PipelineError;
use crate::core::types::ImageBuffer;
use crate::pipeline::definition::PipelineDefinition;
use crate::pipeline::runner::{PipelineRunner, RunOutput};
use crate::steps::registry::{StepInfo, StepRegistry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Validate and run a pipeline with the built-in steps.
pub fn run_pipeline(
    image: ImageBuffer,
    definition: &PipelineDefinition,
) -> Result<RunOutput, PipelineError> {
    PipelineRunner::global().run(image, definition)
}

/// Describe every built-in step, in registration order.
pub fn list_steps() -> Vec<StepInfo> {
    StepRegistry::global().list_steps()
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "pixelchain");
    }

    #[test]
    fn test_list_steps() {
        let names: Vec<_> = super::list_steps().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            ["brightness", "saturation", "hue", "boxblur", "unsharpmask", "crop", "rotate"]
        );
    }

    #[test]
    fn test_black_stays_black_under_brightness() {
        let black = ImageBuffer::filled(8, 8, &[0, 0, 0]).unwrap();
        let pipeline = PipelineDefinition::new()
            .then(StepInvocation::new("brightness").with_param("factor", 2.0));
        let out = super::run_pipeline(black.clone(), &pipeline).unwrap();
        assert_eq!(out.image, black);
    }

    #[test]
    fn test_hue_full_turn_matches_no_turn() {
        let image = ImageBuffer::from_fn(12, 6, 3, |x, y, c| (x * 20 + y * 9 + c as u32 * 70) as u8)
            .unwrap();
        let run = |degrees: f64| {
            let pipeline = PipelineDefinition::new()
                .then(StepInvocation::new("hue").with_param("degrees", degrees));
            super::run_pipeline(image.clone(), &pipeline).unwrap().image
        };
        assert_eq!(run(360.0), run(0.0));
        assert_eq!(run(-90.0), run(270.0));
    }

    #[test]
    fn test_full_chain() {
        let image = ImageBuffer::from_fn(64, 48, 4, |x, y, c| {
            if c == 3 {
                200
            } else {
                (x * 3 + y * 5 + c as u32 * 40) as u8
            }
        })
        .unwrap();
        let pipeline = PipelineDefinition::from_json(
            r#"[
                {"step": "brightness", "params": {"factor": 1.1}},
                {"step": "saturation", "params": {"factor": 0.8}},
                {"step": "hue", "params": {"degrees": 45}},
                {"step": "boxblur", "params": {"radius": 2}},
                {"step": "unsharpmask", "params": {"radius": 3, "amount": 0.5}},
                {"step": "crop", "params": {"x": 4, "y": 4, "width": 40, "height": 30}},
                {"step": "rotate", "params": {"degrees": 90}},
                {"step": "rotate", "params": {"degrees": 30}}
            ]"#,
        )
        .unwrap();

        let runner = PipelineRunner::global();
        let normalized = runner.validate(&pipeline, Some(image.dimensions())).unwrap();
        let out = runner.execute(image, &normalized).unwrap();

        assert_eq!(out.stats.steps_executed, 8);
        assert_eq!(Some(out.image.dimensions()), normalized.output_dimensions());
        assert_eq!(out.image.channels(), 4);
    }

    #[test]
    fn test_custom_step_alongside_builtins() {
        struct Invert;

        impl Step for Invert {
            fn metadata(&self) -> StepMetadata {
                StepMetadata::builder("invert", "Invert")
                    .category(Category::Color)
                    .build()
            }

            fn apply(&self, image: &ImageBuffer, _: &Parameters) -> Result<ImageBuffer, StepError> {
                let colors = image.color_channels();
                Ok(image.map_pixels(|px| px[..colors].iter_mut().for_each(|v| *v = 255 - *v)))
            }
        }

        let registry = RegistryBuilder::new().register(Invert).build().unwrap();
        assert_eq!(registry.len(), 8);

        let white = ImageBuffer::filled(3, 3, &[255, 255, 255]).unwrap();
        let pipeline = PipelineDefinition::new()
            .then(StepInvocation::new("invert"))
            .then(StepInvocation::new("brightness").with_param("factor", 3));
        let out = PipelineRunner::new(&registry).run(white, &pipeline).unwrap();
        assert_eq!(out.image, ImageBuffer::filled(3, 3, &[0, 0, 0]).unwrap());
    }
}
