// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::{DetectError, ImageError};

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

/// What was wrong with the client's upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFault {
    /// No file field in the form
    MissingFile,
    /// Body is not a readable multipart form
    MalformedForm,
    /// Declared content type missing or not `image/*`
    NotAnImage,
    /// Upload exceeds the configured size limit
    TooLarge,
    /// Bytes could not be decoded as an image
    Undecodable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The model failed to load at startup
    ModelUnavailable(String),
    /// The upload was rejected before inference
    InvalidInput { fault: InputFault, message: String },
    /// The model runtime failed during the forward pass
    InferenceFailed(String),
}

impl ApiError {
    pub fn invalid_input(fault: InputFault, message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            fault,
            message: message.into(),
        }
    }

    pub fn not_an_image() -> Self {
        Self::invalid_input(InputFault::NotAnImage, "File provided is not an image.")
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable(_) | ApiError::InferenceFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidInput { fault, .. } => match fault {
                InputFault::MissingFile | InputFault::MalformedForm | InputFault::NotAnImage => {
                    StatusCode::BAD_REQUEST
                }
                InputFault::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                // Decoding failures are reported as server errors
                InputFault::Undecodable => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ModelUnavailable(reason) => {
                write!(f, "Model could not be loaded: {}", reason)
            }
            ApiError::InvalidInput { message, .. } => write!(f, "{}", message),
            ApiError::InferenceFailed(cause) => {
                write!(f, "Error during model inference: {}", cause)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<DetectError> for ApiError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::ModelUnavailable(reason) => ApiError::ModelUnavailable(reason),
            DetectError::InferenceFailed(cause) => ApiError::InferenceFailed(cause),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::TooLarge(..) => {
                ApiError::invalid_input(InputFault::TooLarge, err.to_string())
            }
            _ => ApiError::invalid_input(
                InputFault::Undecodable,
                format!("Error processing image file: {}", err),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
