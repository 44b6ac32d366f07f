// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod http_server;
pub mod upload;

pub use detect::{detect_handler, DetectResponse, DetectionItem};
pub use errors::{ApiError, ErrorResponse, InputFault};
pub use http_server::{create_app, start_server, AppState, HealthResponse, ModelHealth};
pub use upload::{UploadLease, UploadTracker};
