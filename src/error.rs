//! Error types for the driver core.
//!
//! Two layers are kept apart on purpose:
//!
//! - [`Error`] is what backend hooks and helpers return. It aggregates the
//!   heterogeneous low-level failures (HTTP statuses, vendor SDK errors,
//!   transport, I/O, serialization) without interpreting them.
//! - [`LlumiverseError`] is the normalized value produced exactly once at the
//!   driver boundary. It carries the retry verdict and the call context.

use crate::error_code::StandardErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tri-state verdict on whether an identical retry is expected to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retryable {
    /// Transient failure: rate limiting, timeouts, overload, 5xx.
    Yes,
    /// Permanent failure: malformed request, auth, not found, other 4xx.
    No,
    /// Unrecognized failure shape; the caller applies its own policy.
    #[default]
    Unknown,
}

impl Retryable {
    #[inline]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Yes)
    }

    #[inline]
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// `Some(true)`, `Some(false)` or `None` for the unknown verdict.
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Yes => Some(true),
            Self::No => Some(false),
            Self::Unknown => None,
        }
    }
}

impl From<bool> for Retryable {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

impl fmt::Display for Retryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yes => "retryable",
            Self::No => "not_retryable",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Call context attached to every normalized error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Provider identifier of the driver that failed (e.g. "anthropic").
    pub provider: String,
    /// Model the exchange targeted.
    pub model: String,
    /// Driver operation that failed ("execute", "stream").
    pub operation: String,
    /// Backend-native prompt, when it was built before the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<serde_json::Value>,
}

impl ErrorContext {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            operation: operation.into(),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: serde_json::Value) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.provider, self.model, self.operation)
    }
}

/// Error reported by a vendor SDK or API body, with whatever metadata it exposed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderError {
    /// Vendor error type name (e.g. "overloaded_error", "ThrottlingException").
    pub name: Option<String>,
    /// Vendor error code. Only treated as a status code when it is numeric.
    pub code: Option<String>,
    /// HTTP status, when the SDK surfaced one.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Low-level error raised by backend hooks and crate helpers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Network transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} is not implemented by this driver")]
    NotImplemented(&'static str),

    /// An error that already went through the classifier. Passed through unchanged.
    #[error(transparent)]
    Normalized(Box<LlumiverseError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
        }
    }

    pub fn provider(error: ProviderError) -> Self {
        Error::Provider(error)
    }

    /// Short kind name used as the normalized error `name` when the source has none.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::Http { .. } => "HttpError",
            Error::Provider(_) => "ProviderError",
            Error::Transport(_) => "TransportError",
            Error::Io(_) => "IoError",
            Error::Serialization(_) => "SerializationError",
            Error::Configuration(_) => "ConfigurationError",
            Error::Validation(_) => "ValidationError",
            Error::NotImplemented(_) => "NotImplementedError",
            Error::Normalized(_) => "LlumiverseError",
            Error::Other(_) => "Error",
        }
    }
}

impl From<ProviderError> for Error {
    fn from(error: ProviderError) -> Self {
        Error::Provider(error)
    }
}

impl From<LlumiverseError> for Error {
    fn from(error: LlumiverseError) -> Self {
        Error::Normalized(Box::new(error))
    }
}

/// Normalized error returned by every driver operation.
///
/// Constructed once where the raw error is first observed; the original error
/// is kept as the source.
#[derive(Debug, Error)]
#[error("[{}] {message}", .context.provider)]
pub struct LlumiverseError {
    pub message: String,
    /// Numeric status code, when one could be extracted.
    pub code: Option<u16>,
    /// Error type name, when the source exposed one.
    pub name: Option<String>,
    pub retryable: Retryable,
    /// Category derived from `name` and `code`.
    pub standard_code: StandardErrorCode,
    pub context: ErrorContext,
    #[source]
    pub original: Box<Error>,
}

impl LlumiverseError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.retryable.is_retryable()
    }

    pub fn original(&self) -> &Error {
        &self.original
    }
}
