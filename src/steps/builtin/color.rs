//! Colour adjustment steps: brightness, saturation and hue.
//!
//! Saturation and hue work in HSV space (hue in degrees, saturation and value
//! in [0, 1]) and round back to 8-bit. Single-channel images carry no colour,
//! so both return luma input unchanged. A fourth alpha channel is never
//! touched.

use crate::core::context::{Parameters, ValidationContext};
use crate::core::error::StepError;
use crate::core::param::{Constraint, ParameterDefinition};
use crate::core::step::{Category, Step, StepMetadata};
use crate::core::types::{ImageBuffer, Value};
use crate::steps::builtin::{add, wrap_degrees};
use crate::steps::registry::StepRegistry;

/// Register colour steps.
pub(super) fn register(registry: &mut StepRegistry) {
    add(registry, Brightness);
    add(registry, Saturation);
    add(registry, Hue);
}

/// Scales every colour sample by a factor.
#[derive(Debug, Clone)]
pub struct Brightness;

impl Step for Brightness {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("brightness", "Brightness")
            .description("Adjust image brightness by multiplying every sample")
            .category(Category::Color)
            .parameter(
                ParameterDefinition::float("factor", 1.0)
                    .with_description("Brightness multiplier (1.0 keeps the image unchanged)"),
            )
            .build()
    }

    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError> {
        let factor = params.get_float("factor")?;
        let colors = image.color_channels();
        Ok(image.map_pixels(|px| {
            for sample in &mut px[..colors] {
                // Clamp first, then truncate toward zero
                *sample = (*sample as f64 * factor).clamp(0.0, 255.0) as u8;
            }
        }))
    }
}

/// Scales HSV saturation.
#[derive(Debug, Clone)]
pub struct Saturation;

impl Step for Saturation {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("saturation", "Saturation")
            .description("Adjust colour saturation (0 = grayscale, 1 = unchanged)")
            .category(Category::Color)
            .parameter(
                ParameterDefinition::float("factor", 1.0)
                    .with_description("Saturation multiplier")
                    .with_constraint(Constraint::NonNegative),
            )
            .build()
    }

    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError> {
        let factor = params.get_float("factor")?;
        if image.color_channels() < 3 || factor == 1.0 {
            return Ok(image.clone());
        }
        Ok(image.map_pixels(|px| {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            let [r, g, b] = hsv_to_rgb(h, (s * factor).min(1.0), v);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }))
    }
}

/// Rotates HSV hue.
#[derive(Debug, Clone)]
pub struct Hue;

impl Step for Hue {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("hue", "Hue")
            .description("Shift the hue of every pixel around the colour wheel")
            .category(Category::Color)
            .parameter(
                ParameterDefinition::float("degrees", 0.0)
                    .with_description("Hue shift in degrees (wraps modulo 360)"),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<Parameters, StepError> {
        let mut params = ctx.normalize(&self.metadata().parameters)?;
        let degrees = params.get_float("degrees")?;
        params.insert("degrees", Value::Float(wrap_degrees(degrees)));
        Ok(params)
    }

    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError> {
        let shift = wrap_degrees(params.get_float("degrees")?);
        if image.color_channels() < 3 || shift == 0.0 {
            return Ok(image.clone());
        }
        Ok(image.map_pixels(|px| {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            let [r, g, b] = hsv_to_rgb(h + shift, s, v);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }))
    }
}

// ============================================================================
// HSV Conversion
// ============================================================================

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    (h, s, max)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let c = v * s;
    let hp = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [to_sample(r + m), to_sample(g + m), to_sample(b + m)]
}

fn to_sample(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}
