//! The key-value seam underneath [`crate::VectorStore`].
//!
//! A record is a small hash of named byte fields. Backends only need
//! whole-record upsert, point lookup and a prefix scan; they never look
//! inside the fields.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};

pub type Fields = HashMap<String, Vec<u8>>;

pub trait KvStore: Send + Sync {
    /// Replace every field of `key` with `fields` in one step. Readers never
    /// observe a mix of old and new fields.
    fn put_fields(&self, key: &str, fields: &[(&str, &[u8])]) -> Result<()>;

    /// All fields of `key`, or `None` when the key does not exist.
    fn get_fields(&self, key: &str) -> Result<Option<Fields>>;

    /// Every key starting with `prefix`. Order is backend-defined.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-process [`KvStore`]. Scans return keys in first-insertion order.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    order: Vec<String>,
    records: HashMap<String, Fields>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::StoreUnavailable("in-memory store lock poisoned".to_string())
}

impl KvStore for MemoryKv {
    fn put_fields(&self, key: &str, fields: &[(&str, &[u8])]) -> Result<()> {
        let record: Fields = fields.iter().map(|(name, value)| (name.to_string(), value.to_vec())).collect();
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        if inner.records.insert(key.to_string(), record).is_none() {
            inner.order.push(key.to_string());
        }
        Ok(())
    }

    fn get_fields(&self, key: &str) -> Result<Option<Fields>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.records.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.order.iter().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}
