//! Core value types that flow through a pipeline.
//!
//! Two families live here:
//! - [`Value`] / [`ParamType`]: the loosely-typed parameter values a caller
//!   supplies, and the semantic types a step declares for them.
//! - [`ImageBuffer`] / [`Dimensions`]: the decoded pixel data threaded from
//!   step to step.

use crate::core::error::BufferError;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value as supplied by a caller.
///
/// Deserialized untagged, so plain JSON numbers and strings map directly:
/// `1` becomes [`Value::Integer`], `1.5` becomes [`Value::Float`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string (accepted when it parses as a number)
    String(String),
}

/// Semantic type of a step parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ParamType {
    #[serde(rename = "int")]
    Integer,
    #[serde(rename = "float")]
    Float,
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Value {
    /// Get the natural parameter type of this value, if it has one.
    pub fn get_type(&self) -> Option<ParamType> {
        match self {
            Value::Integer(_) => Some(ParamType::Integer),
            Value::Float(_) => Some(ParamType::Float),
            Value::String(_) => None,
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a float.
    /// Integers are automatically converted to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(_) => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// ============================================================================
// ParamType Implementation
// ============================================================================

impl ParamType {
    /// Coerce a supplied value to this type.
    ///
    /// Float accepts integers and numeric strings. Integer accepts floats with
    /// no fractional part and integer strings. Non-finite floats are rejected.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (ParamType::Integer, Value::Integer(i)) => Ok(Value::Integer(*i)),
            (ParamType::Integer, Value::Float(f)) => float_to_integer(*f),
            (ParamType::Integer, Value::String(s)) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Value::Integer(i));
                }
                match trimmed.parse::<f64>() {
                    Ok(f) => float_to_integer(f),
                    Err(_) => Err(format!("expected an integer, got \"{}\"", s)),
                }
            }
            (ParamType::Float, Value::Integer(i)) => Ok(Value::Float(*i as f64)),
            (ParamType::Float, Value::Float(f)) => finite(*f),
            (ParamType::Float, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => finite(f),
                Err(_) => Err(format!("expected a number, got \"{}\"", s)),
            },
        }
    }

    /// Get a human-readable name for this type.
    pub fn display_name(&self) -> &'static str {
        match self {
            ParamType::Integer => "Integer",
            ParamType::Float => "Float",
        }
    }
}

fn finite(f: f64) -> Result<Value, String> {
    if f.is_finite() {
        Ok(Value::Float(f))
    } else {
        Err(format!("expected a finite number, got {}", f))
    }
}

fn float_to_integer(f: f64) -> Result<Value, String> {
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(format!("expected an integer, got {}", f));
    }
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(format!("integer {} is out of range", f));
    }
    Ok(Value::Integer(f as i64))
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Image Buffer
// ============================================================================

/// Shape of an image buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Samples per pixel (1 = luma, 3 = RGB, 4 = RGBA)
    pub channels: u8,
}

impl Dimensions {
    /// Create a new dimension record.
    pub const fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Total number of samples.
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Decoded 8-bit image, row-major with interleaved channels.
///
/// Channel order is RGB (RGBA when an alpha channel is present). A buffer is
/// never mutated once built; steps produce new buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    dims: Dimensions,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Build a buffer from raw samples.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, BufferError> {
        if width == 0 || height == 0 {
            return Err(BufferError::ZeroDimension { width, height });
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(BufferError::UnsupportedChannels(channels));
        }
        let dims = Dimensions::new(width, height, channels);
        if data.len() != dims.sample_count() {
            return Err(BufferError::LengthMismatch {
                expected: dims.sample_count(),
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Build a buffer where every pixel has the same samples.
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Result<Self, BufferError> {
        let channels = u8::try_from(pixel.len())
            .map_err(|_| BufferError::UnsupportedChannels(u8::MAX))?;
        let data = pixel.repeat(width as usize * height as usize);
        Self::new(width, height, channels, data)
    }

    /// Build a buffer by evaluating `f(x, y, channel)` for every sample.
    pub fn from_fn<F>(width: u32, height: u32, channels: u8, mut f: F) -> Result<Self, BufferError>
    where
        F: FnMut(u32, u32, usize) -> u8,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * channels as usize);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels as usize {
                    data.push(f(x, y, c));
                }
            }
        }
        Self::new(width, height, channels, data)
    }

    /// Convert a decoded image, keeping alpha when the source has it.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, BufferError> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(gray) => Self::new(width, height, 1, gray.into_raw()),
            DynamicImage::ImageRgb8(rgb) => Self::new(width, height, 3, rgb.into_raw()),
            DynamicImage::ImageRgba8(rgba) => Self::new(width, height, 4, rgba.into_raw()),
            other if other.color().has_alpha() => {
                Self::new(width, height, 4, other.to_rgba8().into_raw())
            }
            other => Self::new(width, height, 3, other.to_rgb8().into_raw()),
        }
    }

    /// Convert into an `image` crate buffer for encoding or reuse of its operations.
    pub fn to_dynamic(&self) -> Result<DynamicImage, BufferError> {
        let (w, h) = (self.dims.width, self.dims.height);
        let mismatch = || BufferError::LengthMismatch {
            expected: self.dims.sample_count(),
            actual: self.data.len(),
        };
        let data = self.data.clone();
        match self.dims.channels {
            1 => GrayImage::from_raw(w, h, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(mismatch),
            3 => RgbImage::from_raw(w, h, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(mismatch),
            4 => RgbaImage::from_raw(w, h, data)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(mismatch),
            other => Err(BufferError::UnsupportedChannels(other)),
        }
    }

    /// Shape of this buffer.
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.dims.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// Samples per pixel.
    pub fn channels(&self) -> u8 {
        self.dims.channels
    }

    /// Number of leading channels that carry colour (alpha excluded).
    pub fn color_channels(&self) -> usize {
        match self.dims.channels {
            4 => 3,
            c => c as usize,
        }
    }

    /// Raw interleaved samples.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning its samples.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at (x, y).
    ///
    /// Panics if the coordinate is outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.dims.channels as usize;
        let start = (y as usize * self.dims.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Produce a new buffer of the same shape by rewriting every pixel in parallel.
    pub fn map_pixels<F>(&self, f: F) -> Self
    where
        F: Fn(&mut [u8]) + Send + Sync,
    {
        let mut data = self.data.clone();
        data.par_chunks_mut(self.dims.channels as usize).for_each(|px| f(px));
        Self {
            dims: self.dims,
            data,
        }
    }

    /// Split into one single-channel image per channel.
    pub fn split_channels(&self) -> Result<Vec<GrayImage>, BufferError> {
        let c = self.dims.channels as usize;
        let expected = self.dims.width as usize * self.dims.height as usize;
        (0..c)
            .map(|channel| {
                let plane: Vec<u8> = self.data.iter().skip(channel).step_by(c).copied().collect();
                let actual = plane.len();
                GrayImage::from_raw(self.dims.width, self.dims.height, plane)
                    .ok_or(BufferError::LengthMismatch { expected, actual })
            })
            .collect()
    }

    /// Re-interleave single-channel planes into a buffer.
    ///
    /// Every plane must have the dimensions of the first.
    pub fn merge_channels(planes: &[GrayImage]) -> Result<Self, BufferError> {
        let first = planes.first().ok_or(BufferError::UnsupportedChannels(0))?;
        let (width, height) = first.dimensions();
        let channels =
            u8::try_from(planes.len()).map_err(|_| BufferError::UnsupportedChannels(u8::MAX))?;
        let pixels = width as usize * height as usize;
        if let Some(plane) = planes.iter().find(|p| p.dimensions() != (width, height)) {
            return Err(BufferError::LengthMismatch {
                expected: pixels,
                actual: plane.as_raw().len(),
            });
        }

        let mut data = Vec::with_capacity(pixels * planes.len());
        for i in 0..pixels {
            data.extend(planes.iter().map(|plane| plane.as_raw()[i]));
        }
        Self::new(width, height, channels, data)
    }

    /// Get the memory used by the samples, in bytes.
    pub fn estimated_memory_size(&self) -> usize {
        self.data.len()
    }
}
