// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection model backed by ONNX Runtime

use anyhow::{Context, Result};
use image::RgbImage;
use ort::execution_providers::CPUExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::labels::LabelTable;
use super::postprocessing::{decode_output, PostprocessConfig, RawPrediction};
use super::preprocessing::{preprocess_for_detection, DEFAULT_INPUT_SIZE};

/// Options applied when loading a detection model
#[derive(Debug, Clone)]
pub struct YoloModelOptions {
    /// Optional labels file overriding the names embedded in the model
    pub labels_path: Option<PathBuf>,
    /// Thresholds for decoding the raw output
    pub postprocess: PostprocessConfig,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for YoloModelOptions {
    fn default() -> Self {
        Self {
            labels_path: None,
            postprocess: PostprocessConfig::default(),
            intra_threads: 4,
        }
    }
}

/// YOLO detection model
///
/// The session needs exclusive access while running, so concurrent
/// requests take turns on the mutex.
pub struct YoloDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Model input size (width, height)
    input_size: (u32, u32),
    labels: LabelTable,
    postprocess: PostprocessConfig,
    model_path: PathBuf,
}

impl std::fmt::Debug for YoloDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetectionModel")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("classes", &self.labels.len())
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl YoloDetectionModel {
    /// Load a detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The labels file is given but unreadable
    pub fn load<P: AsRef<Path>>(model_path: P, options: YoloModelOptions) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Self::build_session(model_path, options.intra_threads)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input type: {:?}", input.input_type);
        }

        let (embedded_names, imgsz) = Self::read_metadata(&session);

        let labels = match options.labels_path {
            Some(ref path) => LabelTable::from_file(path)?,
            None => embedded_names
                .as_deref()
                .map(LabelTable::from_metadata)
                .unwrap_or_default(),
        };

        if labels.is_empty() {
            warn!("Detection model has no label table, class names fall back to ids");
        }

        let input_size = imgsz.unwrap_or((DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE));

        info!(
            "Detection model loaded - input: {} {}x{}, {} classes",
            input_name,
            input_size.0,
            input_size.1,
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size,
            labels,
            postprocess: options.postprocess,
            model_path: model_path.to_path_buf(),
        })
    }

    #[cfg(feature = "cuda")]
    fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        match cuda_result {
            Ok(session) => {
                info!("CUDA execution provider initialized");
                Ok(session)
            }
            Err(e) => {
                warn!("CUDA execution provider failed: {}, falling back to CPU", e);
                Self::build_cpu_session(model_path, intra_threads)
            }
        }
    }

    #[cfg(not(feature = "cuda"))]
    fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
        Self::build_cpu_session(model_path, intra_threads)
    }

    fn build_cpu_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
        Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))
    }

    /// Read the `names` and `imgsz` custom metadata written by the exporter
    fn read_metadata(session: &Session) -> (Option<String>, Option<(u32, u32)>) {
        let metadata = match session.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to read model metadata: {}", e);
                return (None, None);
            }
        };

        let names = metadata.custom("names").ok().flatten();
        let imgsz = metadata
            .custom("imgsz")
            .ok()
            .flatten()
            .and_then(|raw| parse_imgsz(&raw));

        (names, imgsz)
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Run detection on an RGB image
    ///
    /// Returns boxes in original image coordinates, highest score first.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<RawPrediction>> {
        let (width, height) = self.input_size;
        let (input, info) = preprocess_for_detection(image, width, height);

        let input_value =
            Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        let num_classes = (!self.labels.is_empty()).then(|| self.labels.len());
        let predictions =
            decode_output(output_tensor.view(), &info, num_classes, &self.postprocess)?;

        Ok(predictions)
    }
}

/// Parse `imgsz` metadata such as `[640, 640]` into (width, height)
///
/// The exporter writes (height, width).
fn parse_imgsz(raw: &str) -> Option<(u32, u32)> {
    let dims: Vec<u32> = serde_json::from_str(raw).ok()?;
    match dims.as_slice() {
        [h, w] if *h > 0 && *w > 0 => Some((*w, *h)),
        [s] if *s > 0 => Some((*s, *s)),
        _ => None,
    }
}
