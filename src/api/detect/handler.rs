// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::ImageUpload;
use super::response::DetectResponse;
use crate::api::errors::{ApiError, InputFault};
use crate::api::http_server::AppState;

/// POST /detect/ - Detect objects in an uploaded image
///
/// Accepts a multipart form with a single image file and returns every
/// object the model found, in the model's output order.
///
/// # Request
/// - `file`: image upload; its declared content type must start with `image/`
///
/// # Response
/// - `detections`: list of `{class_id, class_name, confidence, bounding_box}`
///   where `bounding_box` is `[xmin, ymin, xmax, ymax]` in image pixels
///
/// # Errors
/// - 400 Bad Request: no file, malformed form, or not an image
/// - 413 Payload Too Large: upload over the configured limit
/// - 500 Internal Server Error: model not loaded, undecodable image, or
///   inference failure
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let started = Instant::now();

    // 1. Fail fast when the model never loaded
    state.gateway.ensure_ready().map_err(|e| {
        warn!("Detection request rejected: {}", e);
        ApiError::from(e)
    })?;

    // 2. Read and validate the upload
    let multipart = multipart.map_err(|e| {
        ApiError::invalid_input(
            InputFault::MalformedForm,
            format!("Invalid multipart form: {}", e.body_text()),
        )
    })?;

    let upload = ImageUpload::from_multipart(multipart, &state.uploads)
        .await
        .map_err(|e| {
            warn!("Upload rejected: {}", e);
            e
        })?;

    // 3. Decode off the async workers; the upload is released on every outcome
    let max_bytes = state.max_upload_bytes;
    let image = tokio::task::spawn_blocking(move || upload.decode(max_bytes))
        .await
        .map_err(|e| {
            ApiError::invalid_input(
                InputFault::Undecodable,
                format!("Error processing image file: decode task aborted: {}", e),
            )
        })?
        .map_err(|e| {
            warn!("Failed to decode upload: {}", e);
            e
        })?;

    debug!(
        "Decoded image: {}x{}, {} bytes",
        image.width(),
        image.height(),
        image.info().size_bytes
    );

    // 4. Run detection
    let detections = state.gateway.infer(image).await.map_err(|e| {
        warn!("Detection failed: {}", e);
        ApiError::from(e)
    })?;

    info!(
        "Detection complete: {} objects, {}ms",
        detections.len(),
        started.elapsed().as_millis()
    );

    // 5. Convert to response format
    Ok(Json(DetectResponse::from(detections)))
}
