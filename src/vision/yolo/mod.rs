// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO integration for object detection
//!
//! Components:
//! - `preprocessing` - Letterboxing and tensor conversion
//! - `postprocessing` - Output decoding and NMS
//! - `labels` - Class index to name table
//! - `model` - ONNX Runtime session wrapper

pub mod labels;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;

pub use labels::LabelTable;
pub use model::{YoloDetectionModel, YoloModelOptions};
pub use postprocessing::{PostprocessConfig, RawPrediction};
