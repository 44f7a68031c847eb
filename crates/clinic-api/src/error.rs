//! API error responses.
//!
//! Every endpoint reports failures with the same JSON shape:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "INVALID_TOKEN",
//!     "message": "invalid token"
//!   }
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error code and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable code, e.g. "INVALID_TOKEN"
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Wire envelope around [`ApiErrorResponse`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorResponse,
}

impl ApiErrorResponse {
    /// # Example
    ///
    /// ```
    /// use clinic_api::error::ApiErrorResponse;
    ///
    /// let error = ApiErrorResponse::new("BAD_REQUEST", "username is required");
    /// assert_eq!(error.code(), "BAD_REQUEST");
    /// ```
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render with `status`.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(ErrorEnvelope { error: self })).into_response()
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}
