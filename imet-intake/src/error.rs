//! Lookup error taxonomy
//!
//! The provider surfaces failures as short tokens embedded in free text
//! ("E01", "B01", ...). This module carries the closed code set those tokens
//! map onto, plus the typed error every layer of the pipeline returns.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Closed set of lookup error codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupErrorCode {
    #[serde(rename = "E01_INVALID_IMEI")]
    E01InvalidImei,
    #[serde(rename = "E02_INVALID_SN")]
    E02InvalidSn,
    #[serde(rename = "R01_NOT_FOUND")]
    R01NotFound,
    #[serde(rename = "B01_LOW_BALANCE")]
    B01LowBalance,
    #[serde(rename = "S01_SERVICE_INVALID")]
    S01ServiceInvalid,
    #[serde(rename = "S02_SERVICE_INCOMPATIBLE")]
    S02ServiceIncompatible,
    #[serde(rename = "A01_API_KEY_INVALID")]
    A01ApiKeyInvalid,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl LookupErrorCode {
    /// Wire representation, matching the historical API
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupErrorCode::E01InvalidImei => "E01_INVALID_IMEI",
            LookupErrorCode::E02InvalidSn => "E02_INVALID_SN",
            LookupErrorCode::R01NotFound => "R01_NOT_FOUND",
            LookupErrorCode::B01LowBalance => "B01_LOW_BALANCE",
            LookupErrorCode::S01ServiceInvalid => "S01_SERVICE_INVALID",
            LookupErrorCode::S02ServiceIncompatible => "S02_SERVICE_INCOMPATIBLE",
            LookupErrorCode::A01ApiKeyInvalid => "A01_API_KEY_INVALID",
            LookupErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Default HTTP status for this code
    pub fn default_status(&self) -> u16 {
        match self {
            LookupErrorCode::B01LowBalance => 402,
            LookupErrorCode::A01ApiKeyInvalid => 401,
            _ => 400,
        }
    }
}

impl std::fmt::Display for LookupErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed lookup failure: machine code plus human sentence
///
/// `raw_message` retains the original upstream text for diagnostics when the
/// error came from the provider.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LookupError {
    pub code: LookupErrorCode,
    pub message: String,
    pub raw_message: Option<String>,
    pub status: u16,
}

impl LookupError {
    pub fn new(code: LookupErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            raw_message: None,
            status: code.default_status(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_raw_message(mut self, raw: impl Into<String>) -> Self {
        self.raw_message = Some(raw.into());
        self
    }

    /// Internal failure not attributable to caller input or the provider
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(LookupErrorCode::Unknown, message).with_status(500)
    }
}

impl From<sqlx::Error> for LookupError {
    fn from(err: sqlx::Error) -> Self {
        LookupError::internal(format!("Database error: {}", err))
    }
}

impl From<imet_common::Error> for LookupError {
    fn from(err: imet_common::Error) -> Self {
        LookupError::internal(err.to_string())
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (status, body).into_response()
    }
}

/// Result type for lookup operations and API handlers
pub type LookupResult<T> = Result<T, LookupError>;
