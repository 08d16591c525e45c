//! Domain types shared by the loader, the store adapter and the retriever.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A source document. Identity comes from `text` alone (see [`crate::KeyDeriver`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Content-addressed store key, rendered as `<namespace>:<hex digest>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Wrap a key as read back from the store. Use [`crate::KeyDeriver::derive`]
    /// to build keys for new documents.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A fixed-length embedding vector.
///
/// Always non-empty and finite. The persisted form is the JSON object
/// `{"values":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EmbeddingWire")]
pub struct Embedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingWire {
    values: Vec<f32>,
}

impl TryFrom<EmbeddingWire> for Embedding {
    type Error = Error;

    fn try_from(wire: EmbeddingWire) -> Result<Self> {
        Embedding::new(wire.values)
    }
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::Embedding("embedding has no components".to_string()));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Embedding(format!("component {pos} is not finite")));
        }
        Ok(Self { values })
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn to_json(&self) -> String {
        // A struct holding only finite f32s always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"values\":[]}"))
    }

    /// Decode the persisted form. `key` only labels the error.
    pub fn from_json(key: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedRecord {
            key: key.to_string(),
            reason: format!("invalid embedding: {e}"),
        })
    }
}

/// One persisted document: text and embedding are always written together.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: DocumentKey,
    pub text: String,
    pub embedding: Embedding,
}

/// A scored retrieval result. Higher `score` is better.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub key: DocumentKey,
    pub text: String,
    pub score: f64,
}
