//! Error types for the page resolver service
//!
//! HTTP-facing error handling using thiserror; layer errors convert into it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::expiration::{SettingError, ValidationError};
use crate::kv::KvError;
use crate::pages::ResolveError;
use crate::store::StoreError;

// == Page Error Enum ==
/// Unified error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum PageError {
    /// Page missing or inactive
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Page expired; visitors are sent to `redirect_url` when set
    #[error("Page expired: {short_id}")]
    Expired {
        short_id: String,
        redirect_url: Option<String>,
    },

    /// Page exists but launches later
    #[error("Page not yet available: {short_id} launches at {launch_at}")]
    NotYetAvailable {
        short_id: String,
        launch_at: DateTime<Utc>,
    },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Conversions ==
impl From<ResolveError> for PageError {
    fn from(err: ResolveError) -> Self {
        PageError::Internal(err.to_string())
    }
}

impl From<StoreError> for PageError {
    fn from(err: StoreError) -> Self {
        PageError::Internal(err.to_string())
    }
}

impl From<KvError> for PageError {
    fn from(err: KvError) -> Self {
        PageError::Internal(err.to_string())
    }
}

impl From<ValidationError> for PageError {
    fn from(err: ValidationError) -> Self {
        PageError::InvalidRequest(err.to_string())
    }
}

impl From<SettingError> for PageError {
    fn from(err: SettingError) -> Self {
        match err {
            SettingError::Validation(err) => err.into(),
            SettingError::NotFound(what) => PageError::NotFound(what),
            SettingError::Store(err) => err.into(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let PageError::Expired {
            redirect_url: Some(url),
            ..
        } = &self
        {
            return Redirect::temporary(url).into_response();
        }

        let status = match &self {
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
            PageError::Expired { .. } => StatusCode::GONE,
            PageError::NotYetAvailable { .. } => StatusCode::FORBIDDEN,
            PageError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP surface.
pub type Result<T> = std::result::Result<T, PageError>;
