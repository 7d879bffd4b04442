//! Geometric transforms: crop and rotate.
//!
//! These are the only steps that change image dimensions. Both report the
//! dimensions they will produce through `output_dimensions` so the runner can
//! thread predicted sizes through a pipeline before running it.

use crate::core::context::{Parameters, ValidationContext};
use crate::core::error::StepError;
use crate::core::param::ParameterDefinition;
use crate::core::step::{Category, Step, StepMetadata};
use crate::core::types::{Dimensions, ImageBuffer, Value};
use crate::steps::builtin::{add, wrap_degrees};
use crate::steps::registry::StepRegistry;
use rayon::prelude::*;

/// Register transform steps.
pub(super) fn register(registry: &mut StepRegistry) {
    add(registry, Crop);
    add(registry, Rotate);
}

// ============================================================================
// Crop
// ============================================================================

/// Extracts a rectangular region.
#[derive(Debug, Clone)]
pub struct Crop;

#[derive(Debug, Clone, Copy)]
struct CropRect {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl CropRect {
    fn from_params(params: &Parameters) -> Result<Self, StepError> {
        Ok(Self {
            x: params.get_integer("x")?,
            y: params.get_integer("y")?,
            width: params.get_integer("width")?,
            height: params.get_integer("height")?,
        })
    }

    /// Check the rectangle lies inside an image of the given size.
    fn check(&self, dims: Dimensions) -> Result<(), StepError> {
        let (w, h) = (dims.width as i64, dims.height as i64);
        if self.x >= w {
            return Err(StepError::invalid(
                "x",
                format!("x = {} is outside the image width {}", self.x, w),
            ));
        }
        if self.y >= h {
            return Err(StepError::invalid(
                "y",
                format!("y = {} is outside the image height {}", self.y, h),
            ));
        }
        if self.x.saturating_add(self.width) > w {
            return Err(StepError::invalid(
                "width",
                format!(
                    "x + width = {} exceeds the image width {}",
                    self.x.saturating_add(self.width),
                    w
                ),
            ));
        }
        if self.y.saturating_add(self.height) > h {
            return Err(StepError::invalid(
                "height",
                format!(
                    "y + height = {} exceeds the image height {}",
                    self.y.saturating_add(self.height),
                    h
                ),
            ));
        }
        Ok(())
    }

    fn to_u32(value: i64, name: &str) -> Result<u32, StepError> {
        u32::try_from(value)
            .map_err(|_| StepError::execution(format!("{} = {} is out of range", name, value)))
    }
}

impl Step for Crop {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("crop", "Crop")
            .description("Keep only a rectangular region of the image")
            .category(Category::Transform)
            .parameter(
                ParameterDefinition::integer("x", 0)
                    .with_description("Left edge of the region")
                    .with_min(0.0),
            )
            .parameter(
                ParameterDefinition::integer("y", 0)
                    .with_description("Top edge of the region")
                    .with_min(0.0),
            )
            .parameter(
                ParameterDefinition::integer("width", 100)
                    .with_description("Region width in pixels")
                    .with_min(1.0),
            )
            .parameter(
                ParameterDefinition::integer("height", 100)
                    .with_description("Region height in pixels")
                    .with_min(1.0),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<Parameters, StepError> {
        let params = ctx.normalize(&self.metadata().parameters)?;
        if let Some(dims) = ctx.input() {
            CropRect::from_params(&params)?.check(dims)?;
        }
        Ok(params)
    }

    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError> {
        let rect = CropRect::from_params(params)?;
        rect.check(image.dimensions())
            .map_err(|err| StepError::execution(err.to_string()))?;

        let cropped = image.to_dynamic()?.crop_imm(
            CropRect::to_u32(rect.x, "x")?,
            CropRect::to_u32(rect.y, "y")?,
            CropRect::to_u32(rect.width, "width")?,
            CropRect::to_u32(rect.height, "height")?,
        );
        Ok(ImageBuffer::from_dynamic(cropped)?)
    }

    fn output_dimensions(&self, input: Dimensions, params: &Parameters) -> Result<Dimensions, StepError> {
        let rect = CropRect::from_params(params)?;
        Ok(Dimensions::new(
            CropRect::to_u32(rect.width, "width")?,
            CropRect::to_u32(rect.height, "height")?,
            input.channels,
        ))
    }
}

// ============================================================================
// Rotate
// ============================================================================

/// Rotates clockwise by an arbitrary angle.
///
/// Multiples of 90 degrees are exact transposes. Other angles are resampled
/// bilinearly onto a canvas large enough to hold the whole rotated image;
/// uncovered pixels are 0 in every channel. RGBA is interpolated with
/// premultiplied alpha, so edges fade out without darkening.
#[derive(Debug, Clone)]
pub struct Rotate;

impl Step for Rotate {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("rotate", "Rotate")
            .description("Rotate the image clockwise")
            .category(Category::Transform)
            .parameter(
                ParameterDefinition::float("degrees", 0.0)
                    .with_description("Clockwise angle in degrees (wraps modulo 360)"),
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
        let degrees = wrap_degrees(params.get_float("degrees")?);
        let rotated = match quarter_turns(degrees) {
            Some(0) => return Ok(image.clone()),
            Some(1) => image.to_dynamic()?.rotate90(),
            Some(2) => image.to_dynamic()?.rotate180(),
            Some(_) => image.to_dynamic()?.rotate270(),
            None => return rotate_bilinear(image, degrees),
        };
        Ok(ImageBuffer::from_dynamic(rotated)?)
    }

    fn output_dimensions(&self, input: Dimensions, params: &Parameters) -> Result<Dimensions, StepError> {
        let degrees = wrap_degrees(params.get_float("degrees")?);
        let (width, height) = match quarter_turns(degrees) {
            Some(1) | Some(3) => (input.height, input.width),
            Some(_) => (input.width, input.height),
            None => rotated_canvas(input.width, input.height, degrees),
        };
        Ok(Dimensions::new(width, height, input.channels))
    }
}

/// Number of clockwise quarter turns, if the angle is a multiple of 90.
fn quarter_turns(degrees: f64) -> Option<u32> {
    if degrees % 90.0 == 0.0 {
        Some((degrees / 90.0) as u32 % 4)
    } else {
        None
    }
}

/// Size of the smallest canvas holding a `width`x`height` image rotated by `degrees`.
fn rotated_canvas(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (w, h) = (width as f64, height as f64);
    // Small slack so float noise never adds a whole row or column
    let new_w = (w * cos + h * sin - 1e-6).ceil().max(1.0);
    let new_h = (w * sin + h * cos - 1e-6).ceil().max(1.0);
    (new_w as u32, new_h as u32)
}

fn rotate_bilinear(image: &ImageBuffer, degrees: f64) -> Result<ImageBuffer, StepError> {
    let (out_w, out_h) = rotated_canvas(image.width(), image.height(), degrees);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let channels = image.channels() as usize;
    let (cx_in, cy_in) = (image.width() as f64 / 2.0, image.height() as f64 / 2.0);
    let (cx_out, cy_out) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    let mut data = vec![0u8; out_w as usize * out_h as usize * channels];
    data.par_chunks_mut(out_w as usize * channels)
        .enumerate()
        .for_each(|(oy, row)| {
            let dy = oy as f64 + 0.5 - cy_out;
            for ox in 0..out_w as usize {
                let dx = ox as f64 + 0.5 - cx_out;
                // Inverse of the clockwise rotation, in pixel-centre coordinates
                let sx = cos * dx + sin * dy + cx_in - 0.5;
                let sy = -sin * dx + cos * dy + cy_in - 0.5;
                let out = &mut row[ox * channels..(ox + 1) * channels];
                sample_bilinear(image, sx, sy, out);
            }
        });

    Ok(ImageBuffer::new(out_w, out_h, image.channels(), data)?)
}

/// Bilinear sample at a continuous position; neighbours outside the image count as 0.
fn sample_bilinear(image: &ImageBuffer, x: f64, y: f64, out: &mut [u8]) {
    let (x0, y0) = (x.floor(), y.floor());
    let (tx, ty) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);
    let (w, h) = (image.width() as i64, image.height() as i64);
    let taps = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x0 + 1, y0, tx * (1.0 - ty)),
        (x0, y0 + 1, (1.0 - tx) * ty),
        (x0 + 1, y0 + 1, tx * ty),
    ]
    .map(|(px, py, weight)| {
        let inside = weight > 0.0 && px >= 0 && py >= 0 && px < w && py < h;
        inside.then(|| (image.pixel(px as u32, py as u32), weight))
    });
    let inside = || taps.iter().flatten();

    if out.len() == 4 {
        let alpha: f64 = inside().map(|(px, weight)| weight * px[3] as f64).sum();
        let alpha8 = alpha.round().clamp(0.0, 255.0) as u8;
        out[3] = alpha8;
        for (c, slot) in out[..3].iter_mut().enumerate() {
            *slot = if alpha8 > 0 {
                let premultiplied: f64 = inside()
                    .map(|(px, weight)| weight * px[3] as f64 * px[c] as f64)
                    .sum();
                (premultiplied / alpha).round().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
        return;
    }

    for (c, slot) in out.iter_mut().enumerate() {
        let acc: f64 = inside().map(|(px, weight)| weight * px[c] as f64).sum();
        *slot = acc.round().clamp(0.0, 255.0) as u8;
    }
}
