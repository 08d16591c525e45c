use crate::error::{Error, Result};
use crate::types::DocumentKey;

pub const DEFAULT_NAMESPACE: &str = "embedding";

/// Derives content-addressed keys: `<namespace>:<blake3 hex of the raw text>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    namespace: String,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self { namespace: DEFAULT_NAMESPACE.to_string() }
    }
}

impl KeyDeriver {
    pub fn new(namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefix shared by every key this deriver produces, e.g. `embedding:`.
    pub fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    pub fn derive(&self, text: &str) -> DocumentKey {
        DocumentKey::new(format!("{}:{}", self.namespace, hash_content(text)))
    }
}

fn hash_content(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

/// Namespaces end up inside store scan patterns, so glob metacharacters are refused.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::InvalidConfig("key namespace must not be empty".to_string()));
    }
    if let Some(bad) = namespace
        .chars()
        .find(|c| matches!(c, ':' | '*' | '?' | '[' | ']' | '\\') || c.is_whitespace())
    {
        return Err(Error::InvalidConfig(format!(
            "key namespace {namespace:?} contains forbidden character {bad:?}"
        )));
    }
    Ok(())
}
