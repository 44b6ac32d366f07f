// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw YOLO output tensors into boxes
//!
//! Detection exports emit one tensor of shape `[1, 4 + nc, N]` where each of
//! the `N` anchors carries `cx, cy, w, h` in input-tensor pixels followed by
//! one score per class. Some exports transpose this to `[1, N, 4 + nc]`.

use anyhow::Result;
use ndarray::{ArrayViewD, Axis, Ix2};
use std::cmp::Ordering;

use super::preprocessing::PreprocessInfo;

/// Default score threshold applied before NMS
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Default IoU threshold for NMS
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Maximum detections kept per image
pub const MAX_DETECTIONS: usize = 300;

/// A single box as produced by the model runtime
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub class_id: usize,
    pub score: f32,
    /// `[xmin, ymin, xmax, ymax]`
    pub xyxy: [f32; 4],
}

impl RawPrediction {
    fn area(&self) -> f32 {
        (self.xyxy[2] - self.xyxy[0]).max(0.0) * (self.xyxy[3] - self.xyxy[1]).max(0.0)
    }

    fn iou(&self, other: &RawPrediction) -> f32 {
        let ix1 = self.xyxy[0].max(other.xyxy[0]);
        let iy1 = self.xyxy[1].max(other.xyxy[1]);
        let ix2 = self.xyxy[2].min(other.xyxy[2]);
        let iy2 = self.xyxy[3].min(other.xyxy[3]);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Thresholds used while decoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: MAX_DETECTIONS,
        }
    }
}

/// Decode a raw output tensor into predictions in original-image coordinates
///
/// Predictions come back ordered by descending score after per-class NMS.
pub fn decode_output(
    output: ArrayViewD<f32>,
    info: &PreprocessInfo,
    num_classes_hint: Option<usize>,
    config: &PostprocessConfig,
) -> Result<Vec<RawPrediction>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected output shape: {:?}, expected [1, 4 + nc, N]", shape);
    }

    let table = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|e| anyhow::anyhow!("Failed to view output tensor: {}", e))?;

    // Rows are attributes in the usual layout; anchors vastly outnumber attributes
    let channels_first = match num_classes_hint {
        Some(nc) if shape[1] == nc + 4 => true,
        Some(nc) if shape[2] == nc + 4 => false,
        _ => shape[1] <= shape[2],
    };
    let table = if channels_first { table } else { table.reversed_axes() };

    let attributes = table.shape()[0];
    if attributes < 5 {
        anyhow::bail!(
            "Output has {} attributes per anchor, expected at least 5",
            attributes
        );
    }

    let mut candidates = Vec::new();
    for anchor in table.axis_iter(Axis(1)) {
        let (class_id, score) = anchor
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::MIN), |(best_id, best), (id, &s)| {
                if s > best {
                    (id, s)
                } else {
                    (best_id, best)
                }
            });

        if !score.is_finite() || score < config.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
            continue;
        }

        let (x1, y1) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);

        candidates.push(RawPrediction {
            class_id,
            score: score.clamp(0.0, 1.0),
            xyxy: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
        });
    }

    Ok(non_max_suppression(
        candidates,
        config.iou_threshold,
        config.max_detections,
    ))
}

/// Per-class non-maximum suppression
///
/// The survivors are ordered by descending score; ties keep input order.
pub fn non_max_suppression(
    mut candidates: Vec<RawPrediction>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawPrediction> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept: Vec<RawPrediction> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
