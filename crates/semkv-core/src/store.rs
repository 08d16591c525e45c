//! Vector store adapter: persists `(text, embedding)` per content key on top
//! of any [`KvStore`].
//!
//! Layout per record: key `<namespace>:<hex>`, field `text` holding the raw
//! UTF-8 text and field `embedding` holding `{"values":[...]}`.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::key::KeyDeriver;
use crate::kv::{Fields, KvStore};
use crate::types::{DocumentKey, Embedding, StoredRecord};

pub const TEXT_FIELD: &str = "text";
pub const EMBEDDING_FIELD: &str = "embedding";

pub struct VectorStore<K> {
    kv: K,
    keys: KeyDeriver,
}

impl<K: KvStore> VectorStore<K> {
    pub fn new(kv: K, keys: KeyDeriver) -> Self {
        Self { kv, keys }
    }

    pub fn keys(&self) -> &KeyDeriver {
        &self.keys
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Upsert. Text and embedding land in a single write.
    pub fn put(&self, key: &DocumentKey, text: &str, embedding: &Embedding) -> Result<()> {
        let json = embedding.to_json();
        self.kv.put_fields(
            key.as_str(),
            &[(TEXT_FIELD, text.as_bytes()), (EMBEDDING_FIELD, json.as_bytes())],
        )?;
        debug!(key = %key, dim = embedding.dim(), "stored record");
        Ok(())
    }

    /// Point lookup. A malformed record is reported as [`Error::MalformedRecord`].
    pub fn get(&self, key: &DocumentKey) -> Result<Option<StoredRecord>> {
        match self.kv.get_fields(key.as_str())? {
            Some(fields) => decode_record(key.as_str(), fields).map(Some),
            None => Ok(None),
        }
    }

    /// Every record under this store's namespace, in backend scan order.
    ///
    /// Malformed records are logged and left out; store failures abort the scan.
    pub fn scan_all(&self) -> Result<Vec<StoredRecord>> {
        let keys = self.namespace_keys()?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(fields) = self.kv.get_fields(&key)? else {
                // Deleted between the scan and the fetch.
                debug!(key = %key, "record vanished during scan");
                continue;
            };
            match decode_record(&key, fields) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key = %key, error = %e, "skipping malformed record"),
            }
        }
        Ok(records)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.namespace_keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Keys under the namespace, each once, in first-seen scan order.
    fn namespace_keys(&self) -> Result<Vec<String>> {
        let mut keys = self.kv.scan_prefix(&self.keys.prefix())?;
        let mut seen = HashSet::with_capacity(keys.len());
        keys.retain(|key| seen.insert(key.clone()));
        Ok(keys)
    }
}

fn decode_record(key: &str, mut fields: Fields) -> Result<StoredRecord> {
    let malformed = |reason: String| Error::MalformedRecord { key: key.to_string(), reason };
    let text = fields
        .remove(TEXT_FIELD)
        .ok_or_else(|| malformed(format!("missing `{TEXT_FIELD}` field")))?;
    let text = String::from_utf8(text).map_err(|e| malformed(format!("text is not UTF-8: {e}")))?;
    let raw = fields
        .remove(EMBEDDING_FIELD)
        .ok_or_else(|| malformed(format!("missing `{EMBEDDING_FIELD}` field")))?;
    let json = std::str::from_utf8(&raw).map_err(|e| malformed(format!("embedding is not UTF-8: {e}")))?;
    let embedding = Embedding::from_json(key, json)?;
    Ok(StoredRecord { key: DocumentKey::new(key), text, embedding })
}
