// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every option can be passed as a flag or read from the environment.
//! A `.env` file in the working directory is loaded first.

use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::vision::image_utils::DEFAULT_MAX_IMAGE_SIZE;
use crate::vision::yolo::postprocessing::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use crate::vision::yolo::{PostprocessConfig, YoloModelOptions};
use crate::vision::DetectionFilter;

/// Origins of the local web frontends
pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:5174,http://localhost:5175,http://localhost:3000";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("Invalid CORS origin '{0}'")]
    InvalidOrigin(String),

    #[error("Wildcard CORS origin '*' cannot be used with credentials; list origins explicitly")]
    WildcardOrigin,

    #[error("max_upload_bytes must be greater than zero")]
    ZeroUploadLimit,

    #[error("intra_threads must be greater than zero")]
    ZeroThreads,
}

/// Object detection API server
#[derive(Parser, Debug, Clone)]
#[command(name = "detect-node")]
#[command(about = "Serves a YOLO object detection model over HTTP", long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: SocketAddr,

    /// Path to the ONNX detection model
    #[arg(long, env = "MODEL_PATH", default_value = "./models/best.onnx")]
    pub model_path: PathBuf,

    /// Labels file overriding the class names embedded in the model
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Comma-separated list of origins allowed to call the API from a browser
    #[arg(
        long,
        env = "CORS_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_CORS_ORIGINS
    )]
    pub cors_allowed_origins: Vec<String>,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_IMAGE_SIZE)]
    pub max_upload_bytes: usize,

    /// Score threshold applied by the model runtime before NMS
    #[arg(long, env = "RUNTIME_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub runtime_confidence: f32,

    /// IoU threshold for the model runtime's NMS
    #[arg(long, env = "RUNTIME_IOU", default_value_t = DEFAULT_IOU_THRESHOLD)]
    pub runtime_iou: f32,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Drop detections below this confidence before responding
    #[arg(long, env = "MIN_CONFIDENCE")]
    pub min_confidence: Option<f32>,

    /// Sort detections by descending confidence before responding
    #[arg(long, env = "SORT_BY_CONFIDENCE")]
    pub sort_by_confidence: bool,
}

impl ServerConfig {
    /// Load configuration from `.env`, the environment and the command line
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("runtime_confidence", self.runtime_confidence)?;
        check_unit("runtime_iou", self.runtime_iou)?;
        if let Some(min) = self.min_confidence {
            check_unit("min_confidence", min)?;
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        self.allowed_origins()?;
        Ok(())
    }

    /// Parsed CORS allow-list
    ///
    /// Credentials are allowed, so every origin must be listed explicitly.
    pub fn allowed_origins(&self) -> Result<Vec<HeaderValue>, ConfigError> {
        self.cors_allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                if origin == "*" {
                    return Err(ConfigError::WildcardOrigin);
                }
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))
            })
            .collect()
    }

    pub fn model_options(&self) -> YoloModelOptions {
        YoloModelOptions {
            labels_path: self.labels_path.clone(),
            postprocess: PostprocessConfig {
                confidence_threshold: self.runtime_confidence,
                iou_threshold: self.runtime_iou,
                ..PostprocessConfig::default()
            },
            intra_threads: self.intra_threads,
        }
    }

    pub fn detection_filter(&self) -> DetectionFilter {
        DetectionFilter {
            min_confidence: self.min_confidence,
            sort_by_confidence: self.sort_by_confidence,
        }
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}
