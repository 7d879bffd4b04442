//! Codec adapters between encoded images and [`ImageBuffer`].
//!
//! Files go through `image`'s format detection; data URLs are always JPEG.

use crate::core::error::{PixelchainError, PixelchainResult};
use crate::core::types::ImageBuffer;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Decode an image file.
pub fn load_image(path: impl AsRef<Path>) -> PixelchainResult<ImageBuffer> {
    let path = path.as_ref();
    let dynamic = image::open(path)?;
    log::debug!("Loaded {} ({}x{})", path.display(), dynamic.width(), dynamic.height());
    Ok(ImageBuffer::from_dynamic(dynamic)?)
}

/// Encode an image file, choosing the format from the extension.
///
/// `quality` applies to JPEG output only.
pub fn save_image(image: &ImageBuffer, path: impl AsRef<Path>, quality: u8) -> PixelchainResult<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let dynamic = image.to_dynamic()?;
    match format {
        ImageFormat::Jpeg => {
            let mut output = BufWriter::new(std::fs::File::create(path)?);
            write_jpeg(&dynamic, &mut output, quality)?;
            output.flush()?;
        }
        _ => dynamic.save_with_format(path, format)?,
    }

    log::debug!("Saved {} as {:?}", path.display(), format);
    Ok(())
}

/// Encode as a `data:image/jpeg;base64,...` URL.
pub fn encode_data_url(image: &ImageBuffer, quality: u8) -> PixelchainResult<String> {
    let dynamic = image.to_dynamic()?;
    let mut bytes = Cursor::new(Vec::new());
    write_jpeg(&dynamic, &mut bytes, quality)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(bytes.into_inner())))
}

/// Decode a base64 image, with or without a `data:...,` prefix.
pub fn decode_data_url(data: &str) -> PixelchainResult<ImageBuffer> {
    let payload = match data.trim().strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, payload)) => payload,
            None => return Err(PixelchainError::Other("data URL has no ',' separator".to_string())),
        },
        None => data.trim(),
    };
    let bytes = BASE64.decode(payload)?;
    let dynamic = image::load_from_memory(&bytes)?;
    Ok(ImageBuffer::from_dynamic(dynamic)?)
}

// JPEG has no alpha channel.
fn write_jpeg<W: Write>(image: &DynamicImage, writer: &mut W, quality: u8) -> PixelchainResult<()> {
    let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.write_with_encoder(encoder)?,
        other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder)?,
    }
    Ok(())
}
