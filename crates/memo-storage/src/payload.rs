use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Text,
    Json,
}

impl FromStr for ContentType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ContentType::Text),
            "json" => Ok(ContentType::Json),
            _ => Err(StorageError::InvalidInput(format!(
                "Unknown content type: {}. Please use 'text' or 'json'.",
                s
            ))),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Text => write!(f, "text"),
            ContentType::Json => write!(f, "json"),
        }
    }
}

/// User content that passed form validation.
///
/// Store does not re-validate; constructing a `Payload` is where empty input
/// and malformed JSON are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    content: String,
    content_type: ContentType,
}

impl Payload {
    pub fn new(content: &str, content_type: ContentType) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StorageError::InvalidInput(
                "Please enter some content".to_string(),
            ));
        }

        if content_type == ContentType::Json {
            serde_json::from_str::<serde_json::Value>(content)
                .map_err(|_| StorageError::InvalidInput("Invalid JSON format".to_string()))?;
        }

        Ok(Self {
            content: content.to_string(),
            content_type,
        })
    }

    pub fn text(content: &str) -> Result<Self> {
        Self::new(content, ContentType::Text)
    }

    pub fn json(content: &str) -> Result<Self> {
        Self::new(content, ContentType::Json)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Encoded length in bytes; this is the space reserved on the storage account.
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }
}
