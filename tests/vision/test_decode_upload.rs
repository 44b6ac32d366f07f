// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Upload decoding tests across the formats browsers send

use detect_node::vision::{decode_image_bytes, ImageError};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

const LIMIT: usize = 1024 * 1024;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

#[test]
fn test_formats_decode_to_rgb() {
    let source = DynamicImage::new_rgb8(24, 12);
    for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
        let bytes = encode(source.clone(), format);
        let decoded = decode_image_bytes(&bytes, LIMIT)
            .unwrap_or_else(|e| panic!("{:?} failed: {}", format, e));
        assert_eq!((decoded.width(), decoded.height()), (24, 12), "{:?}", format);
        assert_eq!(decoded.info().size_bytes, bytes.len());
    }
}

#[test]
fn test_transparent_png_keeps_color_channels() {
    let mut rgba = RgbaImage::new(4, 4);
    for pixel in rgba.pixels_mut() {
        *pixel = Rgba([200, 10, 30, 0]);
    }
    let bytes = encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

    let decoded = decode_image_bytes(&bytes, LIMIT).unwrap();
    assert_eq!(decoded.rgb().get_pixel(1, 1).0, [200, 10, 30]);
}

#[test]
fn test_garbage_bytes_are_rejected() {
    let err = decode_image_bytes(b"%PDF-1.7 definitely not pixels", LIMIT).unwrap_err();
    assert!(matches!(err, ImageError::UnsupportedFormat));
}

#[test]
fn test_truncated_jpeg_fails_to_decode() {
    let mut bytes = encode(DynamicImage::new_rgb8(32, 32), ImageFormat::Jpeg);
    bytes.truncate(20);

    let err = decode_image_bytes(&bytes, LIMIT).unwrap_err();
    assert!(matches!(err, ImageError::DecodeFailed(_)));
}

#[test]
fn test_limit_is_inclusive() {
    let bytes = encode(DynamicImage::new_rgb8(2, 2), ImageFormat::Png);
    assert!(decode_image_bytes(&bytes, bytes.len()).is_ok());
    assert!(matches!(
        decode_image_bytes(&bytes, bytes.len() - 1),
        Err(ImageError::TooLarge(..))
    ));
}
