//! Retry classification and error normalization.
//!
//! Every failure leaving a driver goes through [`format_llumiverse_error`]
//! exactly once. Errors that already went through it are passed back
//! unchanged, so wrapping layers can call it freely.

use crate::error::{Error, ErrorContext, LlumiverseError, Retryable};
use crate::error_code::StandardErrorCode;

/// Default retry verdict from a status code and an error message.
///
/// A known status wins: 429, 408, 529 and every 5xx are transient, any other
/// 4xx is permanent. Without a conclusive status the message is scanned for
/// rate-limit, timeout and overload wording. This is a heuristic and can
/// misfire on messages that merely mention those words.
///
/// ```rust
/// use llumiverse::driver::is_retryable_error;
/// use llumiverse::Retryable;
///
/// assert_eq!(is_retryable_error(Some(429), ""), Retryable::Yes);
/// assert_eq!(is_retryable_error(Some(401), "rate limit"), Retryable::No);
/// assert_eq!(is_retryable_error(None, "operation timed out"), Retryable::Yes);
/// assert_eq!(is_retryable_error(None, "unexpected failure"), Retryable::Unknown);
/// ```
pub fn is_retryable_error(status: Option<u16>, message: &str) -> Retryable {
    if let Some(status) = status {
        match status {
            408 | 429 | 529 => return Retryable::Yes,
            500..=599 => return Retryable::Yes,
            400..=499 => return Retryable::No,
            _ => {}
        }
    }
    if message_looks_transient(message) {
        Retryable::Yes
    } else {
        Retryable::Unknown
    }
}

fn message_looks_transient(message: &str) -> bool {
    let m = message.to_lowercase();
    let has = |a: &str, b: &str| m.contains(a) && m.contains(b);
    has("rate", "limit")
        || m.contains("timeout")
        || has("timed", "out")
        || has("time", "out")
        || has("resource", "exhaust")
        || m.contains("retry")
        || m.contains("overload")
        || m.contains("throttl")
        || m.contains("429")
        || m.contains("529")
}

/// Transport-level verdict for errors that carry no status.
///
/// Connection failures and client-side timeouts are transient; everything
/// else falls back to the status/message heuristic.
pub fn classify_error(error: &Error) -> Retryable {
    match error {
        Error::Normalized(e) => e.retryable,
        Error::Transport(e) if e.is_timeout() || e.is_connect() => Retryable::Yes,
        Error::Other(e) => is_retryable_error(extract_status_code(error), &format!("{:#}", e)),
        _ => is_retryable_error(extract_status_code(error), &error.to_string()),
    }
}

/// Numeric status carried by `error`, if any.
///
/// Provider codes count only when they parse as a number; vendor codes such
/// as `"ThrottlingException"` are left to the name-based classification.
pub fn extract_status_code(error: &Error) -> Option<u16> {
    match error {
        Error::Http { status, .. } => Some(*status),
        Error::Provider(p) => p
            .status
            .or_else(|| p.code.as_deref().and_then(|c| c.trim().parse().ok())),
        Error::Transport(e) => e.status().map(|s| s.as_u16()),
        Error::Normalized(e) => e.code,
        Error::Other(e) => e.chain().find_map(|cause| {
            if let Some(err) = cause.downcast_ref::<Error>() {
                extract_status_code(err)
            } else if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
                err.status().map(|s| s.as_u16())
            } else {
                None
            }
        }),
        _ => None,
    }
}

/// Error type name used for the normalized error.
pub fn error_name(error: &Error) -> Option<String> {
    match error {
        Error::Provider(p) => p.name.clone(),
        Error::Normalized(e) => e.name.clone(),
        Error::Other(_) => None,
        other => Some(other.kind_name().to_string()),
    }
}

fn error_message(error: &Error) -> String {
    match error {
        Error::Http { message, .. } => message.clone(),
        Error::Provider(p) => p.message.clone(),
        // Every context layer down to the root cause.
        Error::Other(e) => format!("{:#}", e),
        other => other.to_string(),
    }
}

/// Normalize `error` using the default retry classification.
pub fn format_llumiverse_error(error: Error, context: ErrorContext) -> LlumiverseError {
    let verdict = classify_error(&error);
    format_llumiverse_error_with(error, context, verdict)
}

/// Normalize `error` with a verdict computed by the driver.
///
/// An already normalized error is returned as-is, context and verdict included.
pub fn format_llumiverse_error_with(
    error: Error,
    context: ErrorContext,
    retryable: Retryable,
) -> LlumiverseError {
    if let Error::Normalized(normalized) = error {
        return *normalized;
    }

    let code = extract_status_code(&error);
    let name = error_name(&error);
    let standard_code = StandardErrorCode::classify(code, name.as_deref());

    LlumiverseError {
        message: error_message(&error),
        code,
        name,
        retryable,
        standard_code,
        context,
        original: Box::new(error),
    }
}
