// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for object detection
//!
//! This module provides:
//! - Upload decoding into RGB buffers
//! - YOLO detection via ONNX Runtime
//! - The inference gateway shared by all requests

pub mod detection;
pub mod gateway;
pub mod image_utils;
pub mod yolo;

pub use detection::{Detection, DetectionFilter, DetectionResult};
pub use gateway::{
    DetectError, Detector, InferenceGateway, ModelGateway, ModelHandle, ModelStatus,
};
pub use image_utils::{decode_image_bytes, detect_format, DecodedImage, ImageError, ImageInfo};
