use std::path::Path;

use reqwest::{
    Url,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SynopsisError},
    types::InputKind,
};

pub const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";

/// Summarization models requested for a job, sent as the `options` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub models: Vec<String>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            models: vec![DEFAULT_MODEL.to_string()],
        }
    }
}

impl ModelOptions {
    /// Use the given models, or the default model when none are given.
    pub fn with_models(models: Vec<String>) -> Self {
        if models.is_empty() {
            Self::default()
        } else {
            Self { models }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Url(String),
    File { name: String, bytes: Vec<u8> },
    Text(String),
}

impl Payload {
    fn kind(&self) -> InputKind {
        match self {
            Payload::Url(_) => InputKind::Url,
            Payload::File { .. } => InputKind::File,
            Payload::Text(_) => InputKind::Text,
        }
    }
}

/// What the user asked to summarize.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionInput {
    pub kind: InputKind,
    pub payload: Payload,
}

impl SubmissionInput {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Url,
            payload: Payload::Url(url.into()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Text,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn file(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind: InputKind::File,
            payload: Payload::File {
                name: name.into(),
                bytes,
            },
        }
    }

    /// Read a local media file into a file submission.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::file(name, bytes))
    }

    /// Check that the payload matches `kind` and is not empty.
    pub fn validate(&self) -> Result<()> {
        if self.payload.kind() != self.kind {
            return Err(invalid(format!(
                "input type {} does not match a {} payload",
                self.kind,
                self.payload.kind()
            )));
        }

        match &self.payload {
            Payload::Url(url) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(invalid("url is empty".to_string()));
                }
                let parsed = Url::parse(url).map_err(|e| invalid(format!("invalid url: {e}")))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(invalid(format!(
                        "unsupported url scheme: {}",
                        parsed.scheme()
                    )));
                }
            }
            Payload::File { name, bytes } => {
                if name.trim().is_empty() {
                    return Err(invalid("file name is empty".to_string()));
                }
                if bytes.is_empty() {
                    return Err(invalid(format!("file {name} is empty")));
                }
            }
            Payload::Text(text) => {
                if text.trim().is_empty() {
                    return Err(invalid("text is empty".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Short human label, used as a history title when no summary exists.
    pub fn label(&self) -> String {
        match &self.payload {
            Payload::Url(url) => url.trim().to_string(),
            Payload::File { name, .. } => name.clone(),
            Payload::Text(text) => snippet(text, 50),
        }
    }

    /// Encode as the multipart body of `POST /api/v1/submit`.
    pub fn to_form(&self, options: &ModelOptions) -> Result<Form> {
        let form = Form::new()
            .text("type", self.kind.as_str())
            .text("options", serde_json::to_string(options)?);

        let form = match &self.payload {
            Payload::Url(url) => form.text("url", url.trim().to_string()),
            Payload::Text(text) => form.text("text", text.clone()),
            Payload::File { name, bytes } => {
                form.part("file", Part::bytes(bytes.clone()).file_name(name.clone()))
            }
        };
        Ok(form)
    }
}

fn invalid(reason: String) -> SynopsisError {
    SynopsisError::SubmissionFailed { reason }
}

/// First `max_chars` characters of `text` on one line, with an ellipsis when
/// truncated.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
