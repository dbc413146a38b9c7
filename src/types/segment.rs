//! Prompt segments supplied by callers.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Role of a prompt segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
    Tool,
    Safety,
    Negative,
    Mask,
}

/// One logical turn fragment. Immutable once handed to a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: PromptRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PromptFile>,
    /// For tool segments: the id of the tool call this segment answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

impl PromptSegment {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            files: Vec::new(),
            tool_use_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(PromptRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(PromptRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(PromptRole::Assistant, content)
    }

    pub fn safety(content: impl Into<String>) -> Self {
        Self::new(PromptRole::Safety, content)
    }

    /// A tool result answering the call `tool_use_id`.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_use_id: Some(tool_use_id.into()),
            ..Self::new(PromptRole::Tool, content)
        }
    }

    pub fn with_file(mut self, file: PromptFile) -> Self {
        self.files.push(file);
        self
    }
}

/// A file attached to a segment (image, document, audio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub source: FileSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileSource {
    Url { url: String },
    Base64 { data: String },
}

impl PromptFile {
    pub fn from_url(url: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            name: None,
            mime_type,
            source: FileSource::Url { url: url.into() },
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: Option<String>) -> Self {
        Self {
            name: None,
            mime_type,
            source: FileSource::Base64 {
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut file = Self::from_bytes(&bytes, guess_media_type(path));
        file.name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from);
        Ok(file)
    }
}

fn guess_media_type(path: &Path) -> Option<String> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mt = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => return None,
    };
    Some(mt.to_string())
}
