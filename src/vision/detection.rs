// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection results handed from the gateway to the HTTP layer

use std::cmp::Ordering;

use super::yolo::{LabelTable, RawPrediction};

/// One recognized object instance
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Index into the model vocabulary
    pub class_id: usize,
    /// Name from the label table, or the stringified id
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// `[xmin, ymin, xmax, ymax]` in original image pixels
    pub bounding_box: [f32; 4],
}

impl Detection {
    /// Build a detection from a runtime prediction, resolving its class name
    ///
    /// Corners are reordered and the score clamped so that
    /// `xmin <= xmax`, `ymin <= ymax` and `0 <= confidence <= 1` always hold.
    pub fn from_prediction(prediction: RawPrediction, labels: &LabelTable) -> Self {
        let [x1, y1, x2, y2] = prediction.xyxy;
        Self {
            class_id: prediction.class_id,
            class_name: labels.resolve(prediction.class_id),
            confidence: prediction.score.clamp(0.0, 1.0),
            bounding_box: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
        }
    }
}

/// Ordered detections for one image, in the runtime's output order
pub type DetectionResult = Vec<Detection>;

/// Optional post-filtering of a detection result
///
/// The default passes detections through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionFilter {
    /// Drop detections below this confidence
    pub min_confidence: Option<f32>,
    /// Reorder by descending confidence
    pub sort_by_confidence: bool,
}

impl DetectionFilter {
    pub fn is_pass_through(&self) -> bool {
        self.min_confidence.is_none() && !self.sort_by_confidence
    }

    pub fn apply(&self, mut detections: DetectionResult) -> DetectionResult {
        if let Some(min) = self.min_confidence {
            detections.retain(|d| d.confidence >= min);
        }
        if self.sort_by_confidence {
            // Stable sort keeps runtime order among equal scores
            detections.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal)
            });
        }
        detections
    }
}
