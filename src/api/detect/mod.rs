// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint
//!
//! Provides the POST /detect/ endpoint for detecting objects in an uploaded
//! image with the YOLO model.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::detect_handler;
pub use request::{validate_content_type, ImageUpload, FILE_FIELD};
pub use response::{DetectResponse, DetectionItem};
