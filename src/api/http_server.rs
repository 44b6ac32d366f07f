// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server wiring: routes, shared state and middleware

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::detect::detect_handler;
use super::upload::UploadTracker;
use crate::config::ServerConfig;
use crate::vision::{InferenceGateway, ModelGateway, ModelHandle};

/// Headroom for multipart boundaries and part headers on top of the file limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn InferenceGateway>,
    pub uploads: UploadTracker,
    pub max_upload_bytes: usize,
    pub model_path: Option<String>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn InferenceGateway>, max_upload_bytes: usize) -> Self {
        Self {
            gateway,
            uploads: UploadTracker::new(),
            max_upload_bytes,
            model_path: None,
        }
    }

    pub fn with_model_path(mut self, model_path: impl Into<String>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    /// State whose model failed to load
    pub fn new_for_test() -> Self {
        let gateway = ModelGateway::new(ModelHandle::Failed("no model in test".to_string()));
        Self::new(
            Arc::new(gateway),
            crate::vision::image_utils::DEFAULT_MAX_IMAGE_SIZE,
        )
    }
}

/// Model section of the health report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelHealth {
    pub loaded: bool,
    pub path: Option<String>,
    pub classes: usize,
    pub error: Option<String>,
}

/// Response for GET /health
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model: ModelHealth,
    pub version: String,
    /// Package name, version and feature list
    pub build: serde_json::Value,
}

/// CORS policy: listed origins only, methods and headers mirrored, credentials allowed
pub fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the application router
pub fn create_app(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Liveness probe
        .route("/", get(root_handler))
        // Health check
        .route("/health", get(health_handler))
        // Object detection
        .route("/detect/", post(detect_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Object detection API is running!" }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.gateway.status();
    Json(HealthResponse {
        status: if status.loaded { "healthy" } else { "degraded" }.to_string(),
        model: ModelHealth {
            loaded: status.loaded,
            path: state.model_path.clone(),
            classes: status.classes,
            error: status.error,
        },
        version: crate::version::VERSION_NUMBER.to_string(),
        build: crate::version::get_version_info(),
    })
}

/// Load the model, bind the listener and serve until Ctrl-C
pub async fn start_server(config: &ServerConfig) -> Result<()> {
    let allowed_origins = config.allowed_origins()?;

    info!("🧠 Loading detection model from {}", config.model_path.display());
    let model_path = config.model_path.clone();
    let options = config.model_options();
    let handle = tokio::task::spawn_blocking(move || ModelHandle::load(model_path, options))
        .await
        .context("model loading task failed")?;

    if !handle.is_loaded() {
        info!("Server will start without a model; /detect/ requests will fail");
    }

    let gateway = ModelGateway::new(handle).with_filter(config.detection_filter());
    let state = AppState::new(Arc::new(gateway), config.max_upload_bytes)
        .with_model_path(config.model_path.display().to_string());

    info!("CORS allowed origins: {:?}", config.cors_allowed_origins);
    let app = create_app(state, allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    info!("✅ API server listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
