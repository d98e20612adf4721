//! HTTP edge: error mapping and the read-only config routes.

mod config_api;

pub use config_api::{ConfigState, config_router};

use crate::core::CmsError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// A `CmsError` on its way to an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CmsError);

impl From<CmsError> for ApiError {
    fn from(err: CmsError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CmsError::Validation(_) => StatusCode::BAD_REQUEST,
            CmsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CmsError::Forbidden(_) => StatusCode::FORBIDDEN,
            CmsError::CollectionNotFound(_)
            | CmsError::DocumentNotFound { .. }
            | CmsError::VersionNotFound(_) => StatusCode::NOT_FOUND,
            CmsError::DuplicateKey { .. } => StatusCode::CONFLICT,
            CmsError::Configuration(_) | CmsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.0 {
            CmsError::Validation(_) => "validation_error",
            CmsError::Unauthorized(_) => "unauthorized",
            CmsError::Forbidden(_) => "forbidden",
            CmsError::CollectionNotFound(_)
            | CmsError::DocumentNotFound { .. }
            | CmsError::VersionNotFound(_) => "not_found",
            CmsError::DuplicateKey { .. } => "conflict",
            CmsError::Configuration(_) => "configuration_error",
            CmsError::Storage(_) => "storage_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: self.code().to_string(),
        });
        (status, body).into_response()
    }
}
