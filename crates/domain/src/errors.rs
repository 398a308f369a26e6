//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Calmate
///
/// Authentication progress (pending, expired, denied) is normally reported
/// through `AuthOutcome`; the matching variants here exist for callers that
/// only want a token and treat anything else as a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CalmateError {
    /// A required credential or setting could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity provider refused to start a device-code flow.
    #[error("Device code flow unsupported: {0}")]
    DeviceFlowUnsupported(String),

    /// Sign-in has started and is waiting for the user.
    #[error("Authentication pending: {0}")]
    AuthenticationPending(String),

    #[error("Authentication expired: {0}")]
    AuthenticationExpired(String),

    #[error("Authentication denied: {0}")]
    AuthenticationDenied(String),

    /// Non-success response from the calendar API, with the raw body.
    #[error("Remote API error (status {status}): {body}")]
    RemoteApi { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CalmateError {
    /// Stable short label for logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::DeviceFlowUnsupported(_) => "device_flow_unsupported",
            Self::AuthenticationPending(_) => "authentication_pending",
            Self::AuthenticationExpired(_) => "authentication_expired",
            Self::AuthenticationDenied(_) => "authentication_denied",
            Self::RemoteApi { .. } => "remote_api",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::Storage(_) => "storage",
            Self::InvalidInput(_) => "invalid_input",
            Self::LanguageModel(_) => "language_model",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for Calmate operations
pub type Result<T> = std::result::Result<T, CalmateError>;
