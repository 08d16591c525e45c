//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars into a typed [`Settings`]. Provides helpers to expand `~`
//! and `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::key::{validate_namespace, KeyDeriver, DEFAULT_NAMESPACE};

pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L12-v2";
pub const DEFAULT_STORE_ADDRESS: &str = "redis://127.0.0.1/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Embedding model identifier, e.g. `sentence-transformers/all-MiniLM-L12-v2`.
    pub model_name: String,
    /// Local directory with `config.json`, `tokenizer.json` and weights.
    /// Defaults to `models/<last segment of model_name>`.
    pub model_dir: Option<String>,
    /// Vector store connection target.
    pub store_address: String,
    pub connect_timeout_ms: u64,
    pub key_namespace: String,
    pub data_dir: String,
    pub file_extension: String,
    pub max_tokens: usize,
    pub use_fake_embeddings: bool,
    pub fake_embedding_dim: usize,
    pub parallel_scan: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_dir: None,
            store_address: DEFAULT_STORE_ADDRESS.to_string(),
            connect_timeout_ms: 2_000,
            key_namespace: DEFAULT_NAMESPACE.to_string(),
            data_dir: "texts".to_string(),
            file_extension: "txt".to_string(),
            max_tokens: 128,
            use_fake_embeddings: false,
            fake_embedding_dim: 384,
            parallel_scan: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(Error::InvalidConfig("model_name must not be empty".to_string()));
        }
        if self.store_address.trim().is_empty() {
            return Err(Error::InvalidConfig("store_address must not be empty".to_string()));
        }
        validate_namespace(&self.key_namespace)?;
        if self.max_tokens == 0 {
            return Err(Error::InvalidConfig("max_tokens must be positive".to_string()));
        }
        if self.fake_embedding_dim == 0 {
            return Err(Error::InvalidConfig("fake_embedding_dim must be positive".to_string()));
        }
        Ok(())
    }

    pub fn key_deriver(&self) -> Result<KeyDeriver> {
        KeyDeriver::new(self.key_namespace.clone())
    }

    /// `data_dir` expanded and resolved against `base` when relative.
    pub fn data_dir_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.data_dir)
    }

    pub fn model_dir_path(&self, base: &Path) -> PathBuf {
        match &self.model_dir {
            Some(dir) => resolve_with_base(base, dir),
            None => {
                let leaf = self.model_name.rsplit('/').next().unwrap_or(&self.model_name);
                base.join("models").join(leaf)
            }
        }
    }
}

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    /// Loads using `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        let config = Self { figment, env_name: env_name.to_string() };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, env_name: "custom".to_string() }
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self) -> Result<()> {
        let settings = self.settings()?;
        match self.env_name.as_str() {
            "prod" | "production" if settings.use_fake_embeddings => Err(Error::InvalidConfig(
                "use_fake_embeddings is not allowed in production".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Expands `~` and `$VAR`/`${VAR}` in a path string. Unknown variables are
/// left untouched. No canonicalization.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).as_ref())
}

/// [`expand_path`], then join onto `base` unless the result is absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
