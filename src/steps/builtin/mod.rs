//! Built-in step implementations.
//!
//! This module contains the standard steps that ship with pixelchain.

mod blur;
mod color;
mod transform;

use crate::core::step::Step;
use crate::steps::registry::StepRegistry;
use std::sync::Arc;

/// Register all built-in steps.
pub fn register_all(registry: &mut StepRegistry) {
    color::register(registry);
    blur::register(registry);
    transform::register(registry);
}

fn add<S: Step + 'static>(registry: &mut StepRegistry, step: S) {
    let step: Arc<dyn Step> = Arc::new(step);
    registry.insert(step.metadata().name, step);
}

/// Bring an angle in degrees into [0, 360).
pub(crate) fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

// Re-export for direct access
pub use blur::{BoxBlur, UnsharpMask};
pub use color::{Brightness, Hue, Saturation};
pub use transform::{Crop, Rotate};
