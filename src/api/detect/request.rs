// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload extraction and validation for detection requests

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::debug;

use crate::api::errors::{ApiError, InputFault};
use crate::api::upload::{UploadLease, UploadTracker};
use crate::vision::{decode_image_bytes, DecodedImage};

/// Name of the form field carrying the image
pub const FILE_FIELD: &str = "file";

/// Media type prefix required on the uploaded file
const IMAGE_MEDIA_PREFIX: &str = "image/";

/// Check the declared content type of an upload
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) if ct.trim().to_ascii_lowercase().starts_with(IMAGE_MEDIA_PREFIX) => Ok(()),
        _ => Err(ApiError::not_an_image()),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::invalid_input(InputFault::TooLarge, err.body_text())
    } else {
        ApiError::invalid_input(
            InputFault::MalformedForm,
            format!("Invalid multipart form: {}", err.body_text()),
        )
    }
}

/// An uploaded image file, read fully into memory
///
/// Holds an upload lease until it is decoded or dropped.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
    lease: UploadLease,
}

impl ImageUpload {
    /// Read the file field from a multipart form
    ///
    /// The first field named `file`, or carrying a file name, is the upload.
    /// Its content type is checked before the body is read; the multipart
    /// stream is consumed and dropped before this returns.
    pub async fn from_multipart(
        mut multipart: Multipart,
        tracker: &UploadTracker,
    ) -> Result<Self, ApiError> {
        let field = loop {
            match multipart.next_field().await.map_err(multipart_error)? {
                Some(field) if field.name() == Some(FILE_FIELD) || field.file_name().is_some() => {
                    break field
                }
                Some(_) => continue,
                None => {
                    return Err(ApiError::invalid_input(
                        InputFault::MissingFile,
                        format!("Missing '{}' field in form", FILE_FIELD),
                    ))
                }
            }
        };

        let lease = tracker.open();

        let content_type = field.content_type().map(str::to_string);
        validate_content_type(content_type.as_deref())?;

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        debug!(
            "Read upload {:?} ({} bytes, lease {})",
            file_name,
            bytes.len(),
            lease.id()
        );

        Ok(Self {
            file_name,
            content_type: content_type.unwrap_or_default(),
            bytes,
            lease,
        })
    }

    /// Decode into RGB, releasing the upload whatever the outcome
    pub fn decode(self, max_bytes: usize) -> Result<DecodedImage, ApiError> {
        let ImageUpload { bytes, lease, .. } = self;
        let decoded = decode_image_bytes(&bytes, max_bytes);
        drop(bytes);
        drop(lease);
        Ok(decoded?)
    }
}
