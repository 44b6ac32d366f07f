// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::{Detection, DetectionResult};

/// One detected object in the response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionItem {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    /// `[xmin, ymin, xmax, ymax]` in image pixels
    pub bounding_box: [f32; 4],
}

impl From<Detection> for DetectionItem {
    fn from(detection: Detection) -> Self {
        Self {
            class_id: detection.class_id,
            class_name: detection.class_name,
            confidence: detection.confidence,
            bounding_box: detection.bounding_box,
        }
    }
}

/// Response for POST /detect/
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetectResponse {
    pub detections: Vec<DetectionItem>,
}

impl From<DetectionResult> for DetectResponse {
    fn from(result: DetectionResult) -> Self {
        Self {
            detections: result.into_iter().map(DetectionItem::from).collect(),
        }
    }
}
