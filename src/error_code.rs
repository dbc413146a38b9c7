//! Standard error codes used to categorize normalized errors.
//!
//! Vendors report failures with their own vocabularies (`overloaded_error`,
//! `ThrottlingException`, `RESOURCE_EXHAUSTED`, ...). This module folds them,
//! together with HTTP statuses, into one small set of categories. Drivers use
//! it when overriding the retry verdict with SDK-specific knowledge.
//!
//! | Prefix | Category    | Description                    |
//! |--------|-------------|--------------------------------|
//! | E1xxx  | client      | Request-side errors            |
//! | E2xxx  | rate        | Rate limit and quota errors    |
//! | E3xxx  | server      | Provider-side errors           |
//! | E4xxx  | operational | Lifecycle and state conflicts  |
//! | E9xxx  | unknown     | Catch-all / unclassified       |
//!
//! ```rust
//! use llumiverse::error_code::StandardErrorCode;
//! use llumiverse::Retryable;
//!
//! let code = StandardErrorCode::from_provider_code("overloaded_error").unwrap();
//! assert_eq!(code.code(), "E3002");
//! assert_eq!(code.retryable(), Retryable::Yes);
//! ```

use crate::error::Retryable;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardErrorCode {
    /// E1001: Malformed request, invalid parameters, unprocessable entity
    InvalidRequest,
    /// E1002: Invalid, expired, or missing credentials
    Authentication,
    /// E1003: Valid credentials but insufficient permissions
    PermissionDenied,
    /// E1004: Requested model, endpoint, or resource does not exist
    NotFound,
    /// E1005: Input exceeds context window or payload size limit
    RequestTooLarge,
    /// E2001: Request rate limit exceeded
    RateLimited,
    /// E2002: Account usage quota or billing limit reached
    QuotaExhausted,
    /// E3001: Internal server error on provider side
    ServerError,
    /// E3002: Provider service temporarily overloaded
    Overloaded,
    /// E3003: Request timed out before response received
    Timeout,
    /// E4001: State conflict
    Conflict,
    /// E4002: Request was cancelled by the client
    Cancelled,
    /// E9999: Error could not be classified
    #[default]
    Unknown,
}

impl StandardErrorCode {
    /// Returns the canonical code string (e.g., `"E1001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "E1001",
            Self::Authentication => "E1002",
            Self::PermissionDenied => "E1003",
            Self::NotFound => "E1004",
            Self::RequestTooLarge => "E1005",
            Self::RateLimited => "E2001",
            Self::QuotaExhausted => "E2002",
            Self::ServerError => "E3001",
            Self::Overloaded => "E3002",
            Self::Timeout => "E3003",
            Self::Conflict => "E4001",
            Self::Cancelled => "E4002",
            Self::Unknown => "E9999",
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServerError => "server_error",
            Self::Overloaded => "overloaded",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Retry verdict for this category. Conflicts are permanent: an identical
    /// request hits the same state again.
    #[inline]
    pub fn retryable(&self) -> Retryable {
        match self {
            Self::RateLimited | Self::ServerError | Self::Overloaded | Self::Timeout => {
                Retryable::Yes
            }
            Self::Unknown => Retryable::Unknown,
            _ => Retryable::No,
        }
    }

    /// Returns the category: `"client"`, `"rate"`, `"server"`, `"operational"`, or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest
            | Self::Authentication
            | Self::PermissionDenied
            | Self::NotFound
            | Self::RequestTooLarge => "client",
            Self::RateLimited | Self::QuotaExhausted => "rate",
            Self::ServerError | Self::Overloaded | Self::Timeout => "server",
            Self::Conflict | Self::Cancelled => "operational",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a vendor error type/code string to a standard code.
    ///
    /// Covers the OpenAI/Anthropic snake_case types, Bedrock exception names
    /// and Google RPC status names.
    pub fn from_provider_code(provider_code: &str) -> Option<Self> {
        let code = match provider_code {
            "invalid_request" | "invalid_request_error" | "ValidationException"
            | "INVALID_ARGUMENT" | "FAILED_PRECONDITION" => Self::InvalidRequest,
            "authentication" | "authentication_error" | "invalid_api_key"
            | "UnrecognizedClientException" | "UNAUTHENTICATED" => Self::Authentication,
            "permission_denied" | "permission_error" | "AccessDeniedException"
            | "PERMISSION_DENIED" => Self::PermissionDenied,
            "not_found" | "not_found_error" | "model_not_found" | "ResourceNotFoundException"
            | "NOT_FOUND" => Self::NotFound,
            "request_too_large" | "context_length_exceeded" => Self::RequestTooLarge,
            "rate_limited" | "rate_limit_error" | "rate_limit_exceeded" | "ThrottlingException"
            | "RESOURCE_EXHAUSTED" => Self::RateLimited,
            "quota_exhausted" | "insufficient_quota" | "ServiceQuotaExceededException" => {
                Self::QuotaExhausted
            }
            "server_error" | "api_error" | "InternalServerException" | "INTERNAL" => {
                Self::ServerError
            }
            "overloaded" | "overloaded_error" | "ServiceUnavailableException"
            | "ModelNotReadyException" | "UNAVAILABLE" => Self::Overloaded,
            "timeout" | "timeout_error" | "ModelTimeoutException" | "DEADLINE_EXCEEDED" => {
                Self::Timeout
            }
            "conflict" | "ConflictException" | "ABORTED" => Self::Conflict,
            "cancelled" | "CANCELLED" => Self::Cancelled,
            _ => return None,
        };
        Some(code)
    }

    /// Maps an HTTP status code to the most likely standard code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 => Self::Timeout,
            409 => Self::Conflict,
            413 => Self::RequestTooLarge,
            429 => Self::RateLimited,
            499 => Self::Cancelled,
            503 | 529 => Self::Overloaded,
            504 => Self::Timeout,
            500..=599 => Self::ServerError,
            400..=498 => Self::InvalidRequest,
            _ => Self::Unknown,
        }
    }

    /// Classify from whatever metadata is available: the vendor name wins,
    /// then the status code.
    pub fn classify(status: Option<u16>, name: Option<&str>) -> Self {
        name.and_then(Self::from_provider_code)
            .or_else(|| status.map(Self::from_http_status))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for StandardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
