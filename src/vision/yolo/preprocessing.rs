// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detection models

use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size of YOLO detection exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Letterbox padding value (gray), as used when the models are trained
pub const PAD_VALUE: u8 = 114;

/// Preprocess an image for YOLO detection
///
/// Steps:
/// 1. Letterbox to `target_w` x `target_h` (aspect ratio preserved, gray padding)
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
///
/// Returns the tensor together with the info needed to map boxes back.
pub fn preprocess_for_detection(
    image: &RgbImage,
    target_w: u32,
    target_h: u32,
) -> (Array4<f32>, PreprocessInfo) {
    let info = PreprocessInfo::new(image.width(), image.height(), target_w, target_h);
    let letterboxed = letterbox(image, &info, target_w, target_h);

    let mut tensor = Array4::zeros((1, 3, target_h as usize, target_w as usize));

    for (x, y, pixel) in letterboxed.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}

/// Resize image with aspect ratio preservation and padding
///
/// The image is scaled to fit within the target while preserving aspect
/// ratio, then centered on a gray canvas.
fn letterbox(image: &RgbImage, info: &PreprocessInfo, target_w: u32, target_h: u32) -> RgbImage {
    let mut output = RgbImage::from_pixel(target_w, target_h, Rgb([PAD_VALUE; 3]));

    if image.width() == 0 || image.height() == 0 {
        return output;
    }

    let resized = if (info.new_width, info.new_height) == (image.width(), image.height()) {
        image.clone()
    } else {
        image::imageops::resize(image, info.new_width, info.new_height, FilterType::Triangle)
    };

    image::imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    output
}

/// Scaling factor and offsets used during preprocessing
///
/// Used for mapping detection results back to original coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Width of the resized image inside the canvas
    pub new_width: u32,
    /// Height of the resized image inside the canvas
    pub new_height: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl PreprocessInfo {
    pub fn new(orig_w: u32, orig_h: u32, target_w: u32, target_h: u32) -> Self {
        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                new_width: 0,
                new_height: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_w as f32 / orig_w as f32).min(target_h as f32 / orig_h as f32);
        let new_width = ((orig_w as f32 * scale).round() as u32).clamp(1, target_w);
        let new_height = ((orig_h as f32 * scale).round() as u32).clamp(1, target_h);

        Self {
            scale,
            offset_x: (target_w - new_width) / 2,
            offset_y: (target_h - new_height) / 2,
            new_width,
            new_height,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Map a coordinate from preprocessed space back to original image space,
    /// clipped to the image bounds
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (
            orig_x.clamp(0.0, self.original_width as f32),
            orig_y.clamp(0.0, self.original_height as f32),
        )
    }
}
