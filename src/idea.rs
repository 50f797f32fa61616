// src/idea.rs
//! Input collection: turns a raw request into a validated, immutable `Idea`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Extensions the upstream text extractor handles.
pub const SUPPORTED_DOCUMENT_TYPES: &[&str] = &["pdf", "docx", "txt", "md"];

/// Text already extracted from an uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentText {
    pub file_name: String,
    pub text: String,
}

/// What the caller submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdeaInput {
    Text(String),
    Document(DocumentText),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdeaOrigin {
    Text,
    Document { file_name: String },
}

/// Validated idea text. Construct via [`Idea::from_input`] or [`Idea::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Idea {
    text: String,
    origin: IdeaOrigin,
    id: String,
}

impl Idea {
    pub fn from_input(input: IdeaInput, rules: &PipelineConfig) -> Result<Self, PipelineError> {
        match input {
            IdeaInput::Text(text) => Self::build(&text, IdeaOrigin::Text, rules),
            IdeaInput::Document(doc) => {
                let ext = document_extension(&doc.file_name);
                if !SUPPORTED_DOCUMENT_TYPES.contains(&ext.as_str()) {
                    return Err(PipelineError::InvalidInput(format!(
                        "unsupported file type '{}'; expected one of: {}",
                        if ext.is_empty() { "<none>" } else { ext.as_str() },
                        SUPPORTED_DOCUMENT_TYPES.join(", ")
                    )));
                }
                let origin = IdeaOrigin::Document {
                    file_name: doc.file_name.trim().to_string(),
                };
                Self::build(&doc.text, origin, rules)
            }
        }
    }

    /// Shorthand for plain text input.
    pub fn parse(text: &str, rules: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::build(text, IdeaOrigin::Text, rules)
    }

    fn build(raw: &str, origin: IdeaOrigin, rules: &PipelineConfig) -> Result<Self, PipelineError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(PipelineError::InvalidInput(
                "idea is empty; describe the startup idea".to_string(),
            ));
        }
        let chars = text.chars().count();
        if chars < rules.min_idea_chars {
            return Err(PipelineError::InvalidInput(format!(
                "idea is too short ({chars} chars); provide at least {} characters",
                rules.min_idea_chars
            )));
        }
        if chars > rules.max_idea_chars {
            return Err(PipelineError::InvalidInput(format!(
                "idea is too long ({chars} chars); the limit is {} characters",
                rules.max_idea_chars
            )));
        }
        Ok(Self {
            id: anon_hash(text),
            text: text.to_string(),
            origin,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &IdeaOrigin {
        &self.origin
    }

    /// Anonymised id for logs; raw idea text is never logged.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// First 6 bytes of SHA-256 as hex.
pub(crate) fn anon_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn document_extension(file_name: &str) -> String {
    std::path::Path::new(file_name.trim())
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}
