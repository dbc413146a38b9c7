//! Orchestration settings shared by the execute and stream paths.

use crate::error::Error;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Knobs controlling what the core does around each backend call.
///
/// Can be loaded from YAML and overridden from the environment:
/// - `LLUMIVERSE_VALIDATE_RESULTS`
/// - `LLUMIVERSE_ATTACH_PROMPT`
/// - `LLUMIVERSE_REPAIR_CONVERSATIONS`
/// - `LLUMIVERSE_INCLUDE_ORIGINAL_RESPONSE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Check results against `options.result_schema`.
    pub validate_results: bool,
    /// Put the formatted prompt in the context of normalized errors.
    pub attach_prompt_to_errors: bool,
    /// Repair orphaned tool calls in `options.conversation` before formatting.
    pub repair_conversations: bool,
    /// Keep the raw backend response when the call does not say otherwise.
    pub include_original_response: bool,
}

impl DriverConfig {
    pub const DEFAULT: DriverConfig = DriverConfig {
        validate_results: true,
        attach_prompt_to_errors: true,
        repair_conversations: true,
        include_original_response: false,
    };

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::Configuration(format!("invalid driver config: {}", e)))
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from `LLUMIVERSE_*` variables that are set and parse
    /// as booleans (`1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`).
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).as_deref().and_then(parse_flag);
        if let Some(v) = flag("LLUMIVERSE_VALIDATE_RESULTS") {
            self.validate_results = v;
        }
        if let Some(v) = flag("LLUMIVERSE_ATTACH_PROMPT") {
            self.attach_prompt_to_errors = v;
        }
        if let Some(v) = flag("LLUMIVERSE_REPAIR_CONVERSATIONS") {
            self.repair_conversations = v;
        }
        if let Some(v) = flag("LLUMIVERSE_INCLUDE_ORIGINAL_RESPONSE") {
            self.include_original_response = v;
        }
        self
    }

    pub fn with_validate_results(mut self, enabled: bool) -> Self {
        self.validate_results = enabled;
        self
    }

    pub fn with_attach_prompt_to_errors(mut self, enabled: bool) -> Self {
        self.attach_prompt_to_errors = enabled;
        self
    }

    pub fn with_repair_conversations(mut self, enabled: bool) -> Self {
        self.repair_conversations = enabled;
        self
    }

    pub fn with_include_original_response(mut self, enabled: bool) -> Self {
        self.include_original_response = enabled;
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
