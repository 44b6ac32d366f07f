// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference gateway owning the long-lived detection model
//!
//! The model is loaded once at startup. A failed load is remembered in
//! [`ModelHandle::Failed`] so that every later request fails fast with
//! [`DetectError::ModelUnavailable`] instead of retrying the load.

use async_trait::async_trait;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::detection::{Detection, DetectionFilter, DetectionResult};
use super::image_utils::DecodedImage;
use super::yolo::{LabelTable, RawPrediction, YoloDetectionModel, YoloModelOptions};

/// Errors surfaced by the gateway
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectError {
    #[error("Model could not be loaded: {0}")]
    ModelUnavailable(String),

    #[error("Error during model inference: {0}")]
    InferenceFailed(String),
}

/// A loaded detection model
///
/// Implementations must be safe to call from several threads; they
/// serialize internally when the runtime needs exclusive access.
pub trait Detector: Send + Sync {
    /// Run one forward pass, returning boxes in original image coordinates
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<RawPrediction>>;

    /// Class index to name table
    fn labels(&self) -> &LabelTable;
}

impl Detector for YoloDetectionModel {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<RawPrediction>> {
        YoloDetectionModel::detect(self, image)
    }

    fn labels(&self) -> &LabelTable {
        YoloDetectionModel::labels(self)
    }
}

/// Outcome of loading the model at startup
#[derive(Clone)]
pub enum ModelHandle {
    Loaded(Arc<dyn Detector>),
    Failed(String),
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelHandle::Loaded(detector) => f
                .debug_struct("Loaded")
                .field("classes", &detector.labels().len())
                .finish_non_exhaustive(),
            ModelHandle::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

impl ModelHandle {
    /// Load the YOLO model, recording the failure instead of returning it
    pub fn load<P: AsRef<Path>>(model_path: P, options: YoloModelOptions) -> Self {
        let model_path = model_path.as_ref();
        match YoloDetectionModel::load(model_path, options) {
            Ok(model) => {
                let (width, height) = model.input_size();
                info!(
                    "✅ Detection model loaded from {} ({}x{} input)",
                    model.model_path().display(),
                    width,
                    height
                );
                ModelHandle::Loaded(Arc::new(model))
            }
            Err(e) => {
                warn!(
                    "⚠️ Failed to load detection model from {}: {:#}",
                    model_path.display(),
                    e
                );
                ModelHandle::Failed(format!("{:#}", e))
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }
}

/// Snapshot of the gateway for health reporting
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatus {
    pub loaded: bool,
    pub classes: usize,
    pub error: Option<String>,
}

/// Runs decoded images through the detection model
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Current model state
    fn status(&self) -> ModelStatus;

    /// Fail fast when the model is unavailable
    fn ensure_ready(&self) -> Result<(), DetectError>;

    /// Detect objects in a decoded image
    async fn infer(&self, image: DecodedImage) -> Result<DetectionResult, DetectError>;
}

/// Gateway over a [`ModelHandle`]
#[derive(Debug, Clone)]
pub struct ModelGateway {
    handle: ModelHandle,
    filter: DetectionFilter,
}

impl ModelGateway {
    pub fn new(handle: ModelHandle) -> Self {
        Self {
            handle,
            filter: DetectionFilter::default(),
        }
    }

    /// Apply an explicit filter after inference
    pub fn with_filter(mut self, filter: DetectionFilter) -> Self {
        self.filter = filter;
        self
    }

    fn detector(&self) -> Result<Arc<dyn Detector>, DetectError> {
        match &self.handle {
            ModelHandle::Loaded(detector) => Ok(detector.clone()),
            ModelHandle::Failed(reason) => Err(DetectError::ModelUnavailable(reason.clone())),
        }
    }
}

#[async_trait]
impl InferenceGateway for ModelGateway {
    fn status(&self) -> ModelStatus {
        match &self.handle {
            ModelHandle::Loaded(detector) => ModelStatus {
                loaded: true,
                classes: detector.labels().len(),
                error: None,
            },
            ModelHandle::Failed(reason) => ModelStatus {
                loaded: false,
                classes: 0,
                error: Some(reason.clone()),
            },
        }
    }

    fn ensure_ready(&self) -> Result<(), DetectError> {
        self.detector().map(|_| ())
    }

    async fn infer(&self, image: DecodedImage) -> Result<DetectionResult, DetectError> {
        let detector = self.detector()?;

        debug!("Running detection on {}x{} image", image.width(), image.height());

        // Forward passes are CPU-bound; keep them off the async workers.
        // A panic inside the runtime surfaces as a JoinError.
        let detections =
            tokio::task::spawn_blocking(move || run_detection(detector.as_ref(), &image))
                .await
                .map_err(|e| {
                    DetectError::InferenceFailed(format!("inference task aborted: {}", e))
                })??;

        Ok(self.filter.apply(detections))
    }
}

fn run_detection(
    detector: &dyn Detector,
    image: &DecodedImage,
) -> Result<DetectionResult, DetectError> {
    let predictions = detector
        .detect(image.rgb())
        .map_err(|e| DetectError::InferenceFailed(format!("{:#}", e)))?;

    let labels = detector.labels();
    Ok(predictions
        .into_iter()
        .map(|prediction| Detection::from_prediction(prediction, labels))
        .collect())
}
