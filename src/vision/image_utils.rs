// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading and utility functions for detection uploads

use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

/// Default maximum upload size (10MB)
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Image information extracted during loading
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size of the encoded upload in bytes
    pub size_bytes: usize,
}

/// A fully decoded three-channel RGB pixel buffer
///
/// Alpha is discarded and grayscale is expanded during decoding, so every
/// consumer sees the same 8-bit RGB layout regardless of the source codec.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    rgb: RgbImage,
    info: ImageInfo,
}

impl DecodedImage {
    /// Wrap an RGB buffer that did not come from an encoded upload
    pub fn from_rgb(rgb: RgbImage) -> Self {
        let info = ImageInfo {
            width: rgb.width(),
            height: rgb.height(),
            format: ImageFormat::Png,
            size_bytes: 0,
        };
        Self { rgb, info }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }
}

/// Decode raw image bytes from a multipart upload
///
/// # Arguments
/// * `bytes` - Raw encoded image bytes
/// * `max_bytes` - Upper bound on the encoded size
///
/// # Returns
/// * `Ok(DecodedImage)` - RGB pixels plus metadata
/// * `Err(ImageError)` - If the bytes are empty, oversized or undecodable
pub fn decode_image_bytes(bytes: &[u8], max_bytes: usize) -> Result<DecodedImage, ImageError> {
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    Ok(normalize(img, format, bytes.len()))
}

fn normalize(img: DynamicImage, format: ImageFormat, size_bytes: usize) -> DecodedImage {
    let rgb = img.to_rgb8();
    let info = ImageInfo {
        width: rgb.width(),
        height: rgb.height(),
        format,
        size_bytes,
    };
    DecodedImage { rgb, info }
}

/// Detect image format from magic bytes
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
