//! Blur and sharpen steps: box blur and unsharp mask.

use crate::core::context::Parameters;
use crate::core::error::StepError;
use crate::core::param::ParameterDefinition;
use crate::core::step::{Category, Step, StepMetadata};
use crate::core::types::ImageBuffer;
use crate::steps::builtin::add;
use crate::steps::registry::StepRegistry;
use image::{GrayImage, Luma};
use imageproc::integral_image::row_running_sum;
use rayon::prelude::*;

/// Largest accepted blur radius.
pub const MAX_RADIUS: i64 = 1024;

/// Register blur steps.
pub(super) fn register(registry: &mut StepRegistry) {
    add(registry, BoxBlur);
    add(registry, UnsharpMask);
}

/// Averages each sample over a (2r+1)x(2r+1) window.
#[derive(Debug, Clone)]
pub struct BoxBlur;

impl Step for BoxBlur {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("boxblur", "Box Blur")
            .description("Average each pixel with its neighbours in a square window")
            .category(Category::Blur)
            .parameter(
                ParameterDefinition::integer("radius", 1)
                    .with_description("Window radius in pixels (0 leaves the image unchanged)")
                    .with_range(0.0, MAX_RADIUS as f64),
            )
            .build()
    }

    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError> {
        let radius = radius_param(params)?;
        box_blur(image, radius)
    }
}

/// Sharpens by adding back the difference from a box-blurred copy.
#[derive(Debug, Clone)]
pub struct UnsharpMask;

impl Step for UnsharpMask {
    fn metadata(&self) -> StepMetadata {
        StepMetadata::builder("unsharpmask", "Unsharp Mask")
            .description("Sharpen by amplifying the difference from a blurred copy")
            .category(Category::Sharpen)
            .parameter(
                ParameterDefinition::integer("radius", 5)
                    .with_description("Radius of the box blur used as the mask")
                    .with_range(0.0, MAX_RADIUS as f64),
            )
            .parameter(
                ParameterDefinition::float("amount", 1.0)
                    .with_description("Sharpening strength (0 leaves the image unchanged)")
                    .with_min(0.0),
            )
            .build()
    }

    fn apply(&self, image: &ImageBuffer, params: &Parameters) -> Result<ImageBuffer, StepError> {
        let radius = radius_param(params)?;
        let amount = params.get_float("amount")?;
        if radius == 0 || amount == 0.0 {
            return Ok(image.clone());
        }

        let blurred = box_blur(image, radius)?;
        let colors = image.color_channels();
        let channels = image.channels() as usize;
        let data: Vec<u8> = image
            .as_raw()
            .par_iter()
            .zip(blurred.as_raw().par_iter())
            .enumerate()
            .map(|(i, (&orig, &blur))| {
                if i % channels >= colors {
                    return orig;
                }
                let orig = orig as f64;
                (orig + amount * (orig - blur as f64)).clamp(0.0, 255.0) as u8
            })
            .collect();

        Ok(ImageBuffer::new(image.width(), image.height(), image.channels(), data)?)
    }
}

fn radius_param(params: &Parameters) -> Result<u32, StepError> {
    let radius = params.get_integer("radius")?;
    u32::try_from(radius)
        .map_err(|_| StepError::execution(format!("radius {} is out of range", radius)))
}

/// Box-filter every channel independently, replicating edge pixels.
pub(crate) fn box_blur(image: &ImageBuffer, radius: u32) -> Result<ImageBuffer, StepError> {
    if radius == 0 {
        return Ok(image.clone());
    }
    let planes: Vec<GrayImage> = image
        .split_channels()?
        .par_iter()
        .map(|plane| box_mean(plane, radius))
        .collect();
    Ok(ImageBuffer::merge_channels(&planes)?)
}

/// Mean over the (2r+1)x(2r+1) window around each sample, rounded down once.
///
/// Window sums are exact integers; only the final division rounds.
fn box_mean(plane: &GrayImage, radius: u32) -> GrayImage {
    let (width, height) = plane.dimensions();
    let (w, h, r) = (width as usize, height as usize, radius as usize);
    let area = ((2 * r + 1) * (2 * r + 1)) as u64;

    // Horizontal window sums; the running sum covers the edge-padded row
    let mut row_sums = vec![0u32; w * h];
    row_sums
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out)| {
            let mut running = vec![0u32; w + 2 * r];
            row_running_sum(plane, y as u32, &mut running, radius);
            for (x, slot) in out.iter_mut().enumerate() {
                let before = if x == 0 { 0 } else { running[x - 1] };
                *slot = running[x + 2 * r] - before;
            }
        });

    let last_row = h as isize - 1;
    let columns: Vec<Vec<u8>> = (0..w)
        .into_par_iter()
        .map(|x| {
            let at = |y: isize| row_sums[y.clamp(0, last_row) as usize * w + x] as u64;
            let r = r as isize;
            let mut sum: u64 = (-r..=r).map(&at).sum();
            let mut column = Vec::with_capacity(h);
            for y in 0..h as isize {
                column.push((sum / area) as u8);
                sum = sum + at(y + r + 1) - at(y - r);
            }
            column
        })
        .collect();

    GrayImage::from_fn(width, height, |x, y| Luma([columns[x as usize][y as usize]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ValidationContext;
    use crate::core::types::Value;
    use indexmap::IndexMap;
    use proptest::prelude::*;

    fn params(pairs: &[(&str, Value)]) -> Parameters {
        let mut p = Parameters::new();
        for (k, v) in pairs {
            p.insert(*k, v.clone());
        }
        p
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let image = ImageBuffer::from_fn(5, 4, 3, |x, y, c| (x * 40 + y * 9 + c as u32) as u8).unwrap();
        let out = BoxBlur.apply(&image, &params(&[("radius", Value::Integer(0))])).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let image = ImageBuffer::filled(6, 5, &[10, 20, 30]).unwrap();
        let out = BoxBlur.apply(&image, &params(&[("radius", Value::Integer(1))])).unwrap();
        assert_eq!(out, image);

        let out = BoxBlur.apply(&image, &params(&[("radius", Value::Integer(20))])).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_edges_are_replicated() {
        // A single bright centre pixel appears exactly once in every 3x3 window
        let image = ImageBuffer::from_fn(3, 3, 1, |x, y, _| if x == 1 && y == 1 { 90 } else { 0 }).unwrap();
        let out = box_blur(&image, 1).unwrap();
        assert!(out.as_raw().iter().all(|&s| s == 10));
    }

    /// Mean over the clamped window, computed directly.
    fn reference_mean(image: &ImageBuffer, radius: i64, x: i64, y: i64, c: usize) -> u8 {
        let (w, h) = (image.width() as i64, image.height() as i64);
        let mut sum = 0u64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let px = (x + dx).clamp(0, w - 1) as u32;
                let py = (y + dy).clamp(0, h - 1) as u32;
                sum += image.pixel(px, py)[c] as u64;
            }
        }
        (sum / ((2 * radius + 1) * (2 * radius + 1)) as u64) as u8
    }

    #[test]
    fn test_window_sum_rounds_down_once() {
        // Column sums 5 + 2 + 2 = 9 over a 3x3 window
        let image = ImageBuffer::new(3, 3, 1, vec![5, 0, 0, 2, 0, 0, 2, 0, 0]).unwrap();
        let out = box_blur(&image, 1).unwrap();
        assert_eq!(out.pixel(1, 1), &[1]);
    }

    #[test]
    fn test_matches_direct_window_mean() {
        let image = ImageBuffer::from_fn(32, 32, 3, |x, y, c| (x * 7 + y * 3 + c as u32 * 11) as u8).unwrap();
        for radius in [1u32, 2, 5] {
            let out = box_blur(&image, radius).unwrap();
            for y in 0..32 {
                for x in 0..32 {
                    for c in 0..3 {
                        assert_eq!(
                            out.pixel(x, y)[c],
                            reference_mean(&image, radius as i64, x as i64, y as i64, c),
                            "radius {} at ({}, {}) channel {}",
                            radius,
                            x,
                            y,
                            c
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_radius_larger_than_image() {
        let image = ImageBuffer::from_fn(4, 3, 1, |x, y, _| (x * 50 + y * 20) as u8).unwrap();
        let out = box_blur(&image, 9).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(out.pixel(x, y)[0], reference_mean(&image, 9, x as i64, y as i64, 0));
            }
        }
    }

    #[test]
    fn test_blur_keeps_channels_separate() {
        let image = ImageBuffer::filled(4, 4, &[255, 0, 0, 128]).unwrap();
        let out = box_blur(&image, 2).unwrap();
        assert_eq!(out.pixel(0, 0), &[255, 0, 0, 128]);
        assert_eq!(out.dimensions(), image.dimensions());
    }

    #[test]
    fn test_unsharp_mask_sharpens_and_clamps() {
        let image = ImageBuffer::from_fn(3, 1, 3, |x, _, _| if x == 1 { 90 } else { 0 }).unwrap();
        let p = params(&[("radius", Value::Integer(1)), ("amount", Value::Float(1.0))]);
        let out = UnsharpMask.apply(&image, &p).unwrap();
        assert_eq!(out.pixel(0, 0), &[0, 0, 0]);
        assert_eq!(out.pixel(1, 0), &[150, 150, 150]);
        assert_eq!(out.pixel(2, 0), &[0, 0, 0]);
    }

    #[test]
    fn test_unsharp_mask_zero_amount_is_identity() {
        let image = ImageBuffer::from_fn(4, 4, 3, |x, y, c| (x * 50 + y * 3 + c as u32) as u8).unwrap();
        let p = params(&[("radius", Value::Integer(2)), ("amount", Value::Float(0.0))]);
        assert_eq!(UnsharpMask.apply(&image, &p).unwrap(), image);
    }

    #[test]
    fn test_unsharp_mask_keeps_alpha() {
        let image = ImageBuffer::from_fn(3, 1, 4, |x, _, c| if c == 3 { 200 } else if x == 1 { 90 } else { 0 })
            .unwrap();
        let p = params(&[("radius", Value::Integer(1)), ("amount", Value::Float(1.0))]);
        let out = UnsharpMask.apply(&image, &p).unwrap();
        assert_eq!(out.pixel(1, 0), &[150, 150, 150, 200]);
    }

    #[test]
    fn test_radius_validation() {
        let supplied: IndexMap<String, Value> = [("radius".to_string(), Value::Integer(-1))].into();
        assert!(BoxBlur.validate(&ValidationContext::new(&supplied)).is_err());

        let supplied: IndexMap<String, Value> = [("radius".to_string(), Value::Float(2.0))].into();
        let p = BoxBlur.validate(&ValidationContext::new(&supplied)).unwrap();
        assert_eq!(p.get_integer("radius").unwrap(), 2);

        let supplied: IndexMap<String, Value> = [("radius".to_string(), Value::Float(2.5))].into();
        assert!(BoxBlur.validate(&ValidationContext::new(&supplied)).is_err());
    }

    #[test]
    fn test_unsharp_defaults() {
        let supplied = IndexMap::new();
        let p = UnsharpMask.validate(&ValidationContext::new(&supplied)).unwrap();
        assert_eq!(p.get_integer("radius").unwrap(), 5);
        assert_eq!(p.get_float("amount").unwrap(), 1.0);
        let again = UnsharpMask.validate(&ValidationContext::new(p.as_map())).unwrap();
        assert_eq!(again, p);
    }

    proptest! {
        #[test]
        fn prop_unsharp_mask_any_amount(
            radius in 0i64..6,
            amount in 0.0f64..1.0e9,
            data in prop::collection::vec(any::<u8>(), 6 * 5 * 4),
        ) {
            let image = ImageBuffer::new(6, 5, 4, data).unwrap();
            let p = params(&[("radius", Value::Integer(radius)), ("amount", Value::Float(amount))]);
            let out = UnsharpMask.apply(&image, &p).unwrap();
            prop_assert_eq!(out.dimensions(), image.dimensions());
            for (before, after) in image.as_raw().chunks(4).zip(out.as_raw().chunks(4)) {
                prop_assert_eq!(before[3], after[3]);
            }
        }

        #[test]
        fn prop_box_blur_stays_within_channel_range(
            radius in 1u32..6,
            data in prop::collection::vec(any::<u8>(), 7 * 4 * 3),
        ) {
            let image = ImageBuffer::new(7, 4, 3, data).unwrap();
            let out = box_blur(&image, radius).unwrap();
            prop_assert_eq!(out.dimensions(), image.dimensions());
            for c in 0..3 {
                let channel = || image.as_raw().iter().skip(c).step_by(3).copied();
                let (lo, hi) = (channel().min().unwrap(), channel().max().unwrap());
                for &sample in out.as_raw().iter().skip(c).step_by(3) {
                    prop_assert!(lo <= sample && sample <= hi);
                }
            }
        }
    }
}
