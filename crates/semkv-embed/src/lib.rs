//! Embedder collaborators: a candle BERT sentence-embedding model loaded
//! from local files, and a hashing fake for tests and development.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use semkv_core::config::Settings;
use semkv_core::traits::Embedder;
use semkv_core::{Embedding, Error};

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

/// Sentence embeddings from a BERT-family encoder (all-MiniLM and friends):
/// mean pooling over the attention mask, then L2 normalization.
///
/// The model directory must hold `config.json`, `tokenizer.json` and either
/// `model.safetensors` or `pytorch_model.bin`.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn load(model_id: &str, model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(model = model_id, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let config_path = model_dir.join("config.json");
        let config_json = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&config_json)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        let raw: serde_json::Value = serde_json::from_str(&config_json)?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config).context("building BERT model")?;
        info!(model = model_id, dim, "embedding model loaded");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let values: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if values.len() != self.dim {
            return Err(anyhow!("model returned {} dims, expected {}", values.len(), self.dim));
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(ms = elapsed.as_millis() as u64, "slow embedding");
        }
        Ok(values)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let weights: HashMap<String, Tensor> = if safetensors.exists() {
        debug!(path = %safetensors.display(), "loading safetensors weights");
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let pth = model_dir.join("pytorch_model.bin");
        debug!(path = %pth.display(), "loading pickled weights");
        candle_core::pickle::read_all(&pth)
            .with_context(|| format!("reading {}", pth.display()))?
            .into_iter()
            .collect()
    };
    Ok(VarBuilder::from_tensors(weights, DType::F32, device))
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }
    fn dim(&self) -> usize {
        self.dim
    }
    fn max_len(&self) -> usize {
        self.max_len
    }
    fn embed(&self, text: &str) -> semkv_core::Result<Embedding> {
        let values = self.embed_text(text).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        Embedding::new(values)
    }
}

/// Deterministic bag-of-words hashing embedder. Same text, same vector; texts
/// sharing words land close together. No model files needed.
pub struct FakeEmbedder {
    dim: usize,
    model_id: String,
}

impl FakeEmbedder {
    /// Fails with [`Error::InvalidConfig`] when `dim` is zero.
    pub fn new(dim: usize) -> semkv_core::Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("fake embedding dimension must be positive".to_string()));
        }
        Ok(Self { dim, model_id: format!("fake:xxh64:d{dim}") })
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }
    fn dim(&self) -> usize {
        self.dim
    }
    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed(&self, text: &str) -> semkv_core::Result<Embedding> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        let mut tokens = 0usize;
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
            tokens += 1;
        }
        if tokens == 0 {
            return Err(Error::Embedding("text has no tokens to embed".to_string()));
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Embedding::new(v)
    }
}

/// Builds the embedder described by `settings`. Relative model paths resolve
/// against `base`.
pub fn get_default_embedder(settings: &Settings, base: &Path) -> semkv_core::Result<Box<dyn Embedder>> {
    settings.validate()?;
    if settings.use_fake_embeddings {
        info!(dim = settings.fake_embedding_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_embedding_dim)?));
    }
    let model_dir = settings.model_dir_path(base);
    if !model_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "model directory {} for {} (set model_dir or APP_MODEL_DIR)",
            model_dir.display(),
            settings.model_name
        )));
    }
    let model = BertEmbedder::load(&settings.model_name, &model_dir, settings.max_tokens)
        .map_err(|e| Error::Embedding(format!("loading {}: {e:#}", settings.model_name)))?;
    Ok(Box::new(model))
}
