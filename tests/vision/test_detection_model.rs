// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection model loading tests
//!
//! Tests marked `#[ignore]` need a YOLO ONNX export at `MODEL_PATH`
//! (default `./models/best.onnx`).

use detect_node::vision::{
    yolo::{YoloDetectionModel, YoloModelOptions},
    InferenceGateway, ModelGateway, ModelHandle,
};
use image::RgbImage;
use std::io::Write;
use tempfile::NamedTempFile;

fn model_path() -> String {
    std::env::var("MODEL_PATH").unwrap_or_else(|_| "./models/best.onnx".to_string())
}

#[test]
fn test_missing_model_is_reported() {
    let err = YoloDetectionModel::load("/nonexistent/best.onnx", YoloModelOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_invalid_model_file_leaves_gateway_unavailable() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"this is not an onnx graph").unwrap();

    let handle = ModelHandle::load(file.path(), YoloModelOptions::default());
    assert!(!handle.is_loaded());

    let gateway = ModelGateway::new(handle);
    assert!(gateway.ensure_ready().is_err());
    let status = gateway.status();
    assert!(!status.loaded);
    assert!(status.error.is_some());
}

#[tokio::test]
#[ignore] // Requires model file
async fn test_real_model_detects_on_blank_image() {
    let model = YoloDetectionModel::load(model_path(), YoloModelOptions::default())
        .expect("Failed to load model");
    assert!(!model.labels().is_empty());

    let image = RgbImage::new(320, 240);
    let first = model.detect(&image).expect("Detection failed");
    let second = model.detect(&image).expect("Detection failed");
    assert_eq!(first, second);

    for prediction in &first {
        let [x1, y1, x2, y2] = prediction.xyxy;
        assert!(x1 <= x2 && y1 <= y2);
        assert!(x2 <= 320.0 && y2 <= 240.0);
    }
}
