//! API response envelope
//!
//! Route handlers wrap every engine result as `{success, data|error, message}`.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RentalError};

/// JSON envelope returned by route handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the call succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error code on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    /// Human readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    /// Successful response with a message
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        }
    }

    /// Failed response built from an engine error
    pub fn from_error(err: &RentalError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.code()),
            message: Some(err.to_string()),
        }
    }

    /// HTTP status matching this envelope
    pub fn http_status(&self) -> u16 {
        match self.error {
            Some(code) => code.http_status(),
            None => 200,
        }
    }
}

impl<T> From<Result<T, RentalError>> for ApiResponse<T> {
    fn from(result: Result<T, RentalError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}
