//! Shared JSON response envelope.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

/// The envelope every JSON body travels in: `status` flags success, `data`
/// carries the payload, and `message` is omitted when empty.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ApiResponse {
    pub fn success(data: Value, message: impl Into<String>) -> Self {
        Self {
            status: true,
            data,
            message: message.into(),
        }
    }

    /// Error envelopes carry an empty array as `data`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: false,
            data: json!([]),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
