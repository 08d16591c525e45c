//! Redis backend for the vector store.
//!
//! Each record is a Redis hash (`HSET <key> text ... embedding ...`). Every
//! operation checks out its own connection and drops it before returning, so
//! no connection outlives the call that needed it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use redis::{Commands, ErrorKind, RedisError};
use tracing::{debug, info};

use semkv_core::kv::{Fields, KvStore};
use semkv_core::{Error, Result};

pub struct RedisKv {
    client: redis::Client,
    address: String,
    timeout: Duration,
}

impl RedisKv {
    /// Parses `address` and pings the server once.
    pub fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(address).map_err(|e| map_open_error(address, e))?;
        let store = Self { client, address: address.to_string(), timeout };
        let mut conn = store.connection()?;
        redis::cmd("PING").query::<String>(&mut conn).map_err(|e| store.map_error(e))?;
        info!(address, "connected to vector store");
        Ok(store)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connection(&self) -> Result<redis::Connection> {
        self.client
            .get_connection_with_timeout(self.timeout)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", self.address)))
    }

    fn map_error(&self, e: RedisError) -> Error {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            Error::StoreUnavailable(format!("{}: {e}", self.address))
        } else {
            Error::Store(e.to_string())
        }
    }
}

fn map_open_error(address: &str, e: RedisError) -> Error {
    if e.kind() == ErrorKind::InvalidClientConfig {
        Error::InvalidConfig(format!("store_address {address:?}: {e}"))
    } else {
        Error::StoreUnavailable(format!("{address}: {e}"))
    }
}

impl KvStore for RedisKv {
    fn put_fields(&self, key: &str, fields: &[(&str, &[u8])]) -> Result<()> {
        let mut conn = self.connection()?;
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !fields.is_empty() {
            pipe.hset_multiple(key, fields).ignore();
        }
        pipe.query::<()>(&mut conn).map_err(|e| self.map_error(e))?;
        debug!(key, fields = fields.len(), "HSET");
        Ok(())
    }

    fn get_fields(&self, key: &str) -> Result<Option<Fields>> {
        let mut conn = self.connection()?;
        let fields: HashMap<String, Vec<u8>> = conn.hgetall(key).map_err(|e| self.map_error(e))?;
        Ok(if fields.is_empty() { None } else { Some(fields) })
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.connection()?;
        let pattern = format!("{prefix}*");
        // SCAN may yield a key more than once.
        let mut seen = HashSet::new();
        let keys: Vec<String> = conn
            .scan_match::<_, String>(&pattern)
            .map_err(|e| self.map_error(e))?
            .filter(|key| seen.insert(key.clone()))
            .collect();
        debug!(pattern = %pattern, keys = keys.len(), "SCAN");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_address_is_invalid_config() {
        let err = RedisKv::connect("definitely not a url", Duration::from_millis(200)).err().expect("error");
        assert!(matches!(err, Error::InvalidConfig(_)), "{err}");
    }

    #[test]
    fn unreachable_server_is_store_unavailable() {
        // Port 1 on loopback is never a Redis server.
        let err = RedisKv::connect("redis://127.0.0.1:1/", Duration::from_millis(200)).err().expect("error");
        assert!(matches!(err, Error::StoreUnavailable(_)), "{err}");
    }
}
