//! Result-schema validation.
//!
//! A mismatch never fails the call: it is recorded on `Completion::error` so
//! the caller still gets the unconfirmed result.

use crate::types::{Completion, CompletionError, CompletionResult};
use jsonschema::JSONSchema;
use serde_json::{json, Value};

/// Check `result` against `schema` and return the parsed JSON value.
pub fn validate_result(result: &[CompletionResult], schema: &Value) -> Result<Value, CompletionError> {
    let value = match result {
        [CompletionResult::Json(value)] => value.clone(),
        _ => {
            let text = crate::types::result_text(result);
            extract_json(&text).ok_or_else(|| {
                CompletionError::validation(
                    "Result is not valid JSON",
                    Some(json!({ "text": text })),
                )
            })?
        }
    };

    let compiled = JSONSchema::compile(schema).map_err(|e| {
        CompletionError::validation(format!("Invalid result schema: {}", e), None)
    })?;

    if let Err(errors) = compiled.validate(&value) {
        let details: Vec<Value> = errors
            .map(|e| json!({ "path": e.instance_path.to_string(), "message": e.to_string() }))
            .collect();
        let summary = details
            .iter()
            .filter_map(|d| d["message"].as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CompletionError::validation(
            format!("Result does not match schema: {}", summary),
            Some(Value::Array(details)),
        ));
    }
    Ok(value)
}

/// Validate in place: success replaces the result with the parsed JSON,
/// failure is stored on `completion.error`.
pub fn validate_completion(completion: &mut Completion, schema: Option<&Value>) {
    let Some(schema) = schema else {
        return;
    };
    match validate_result(&completion.result, schema) {
        Ok(value) => completion.result = vec![CompletionResult::Json(value)],
        Err(error) => completion.error = Some(error),
    }
}

/// Parse JSON out of model text: the whole text, a fenced block, or the
/// outermost object/array.
pub(crate) fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```") {
        let body = &trimmed[start + 3..];
        let body = body.strip_prefix("json").unwrap_or(body);
        if let Some(end) = body.find("```") {
            if let Ok(value) = serde_json::from_str(body[..end].trim()) {
                return Some(value);
            }
        }
    }

    let start = trimmed.find(['{', '['])?;
    let end = trimmed.rfind(['}', ']'])?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
