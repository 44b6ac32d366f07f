// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the detection node

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Supported features in this build
pub const FEATURES: &[&str] = &[
    "yolo-onnx",
    "letterbox-preprocessing",
    "per-class-nms",
    "cors-allow-list",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Detect Node {}", VERSION_NUMBER)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "name": PACKAGE_NAME,
        "version": VERSION_NUMBER,
        "features": FEATURES,
    })
}
