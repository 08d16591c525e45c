//! Ingest and query pipeline over a [`VectorStore`] and an [`Embedder`].
//!
//! Write path: document → embed → content key → put.
//! Read path: query → embed → full scan → best match.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use semkv_core::config::Settings;
use semkv_core::kv::KvStore;
use semkv_core::loader::{DocumentLoader, SourceDocument};
use semkv_core::traits::Embedder;
use semkv_core::{DocumentKey, Error, Result, Retriever, ScoredCandidate, VectorStore};
use semkv_embed::get_default_embedder;
use semkv_store::RedisKv;

/// A document that could not be ingested. The rest of the batch was not affected.
#[derive(Debug)]
pub struct IngestFailure {
    pub source: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    /// Keys written, in input order. Re-ingested text shows up under the same key.
    pub stored: Vec<DocumentKey>,
    pub failed: Vec<IngestFailure>,
}

pub struct SearchEngine<K> {
    store: VectorStore<K>,
    embedder: Box<dyn Embedder>,
    parallel_scan: bool,
    progress: bool,
}

impl<K: KvStore> SearchEngine<K> {
    pub fn new(store: VectorStore<K>, embedder: Box<dyn Embedder>) -> Self {
        Self { store, embedder, parallel_scan: false, progress: false }
    }

    pub fn with_parallel_scan(mut self, enabled: bool) -> Self {
        self.parallel_scan = enabled;
        self
    }

    /// Draw an indicatif progress bar while ingesting.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn store(&self) -> &VectorStore<K> {
        &self.store
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embeds and stores each document. Embedding failures are recorded per
    /// document; a store failure aborts the batch and is returned.
    pub fn ingest(&self, docs: &[SourceDocument]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        if docs.is_empty() {
            info!("no documents to ingest");
            return Ok(report);
        }
        info!(documents = docs.len(), model = self.embedder.model_id(), "ingesting");

        let pb = self.progress_bar(docs.len());
        for doc in docs {
            let source = doc.path.display().to_string();
            pb.set_message(source.clone());
            match self.ingest_one(&doc.document.text) {
                Ok(key) => {
                    info!(key = %key, source = %source, "stored embedding");
                    report.stored.push(key);
                }
                Err(e) if e.is_per_item() => {
                    warn!(source = %source, error = %e, "skipping document");
                    report.failed.push(IngestFailure { source, error: e });
                }
                Err(e) => {
                    pb.abandon_with_message("ingestion aborted");
                    return Err(e);
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("ingestion completed");
        info!(stored = report.stored.len(), failed = report.failed.len(), "ingestion finished");
        Ok(report)
    }

    pub fn ingest_directory(&self, loader: &DocumentLoader, dir: &Path) -> Result<IngestReport> {
        let docs = loader.load_directory(dir)?;
        self.ingest(&docs)
    }

    fn ingest_one(&self, text: &str) -> Result<DocumentKey> {
        let embedding = self.embedder.embed(text)?;
        if embedding.dim() != self.embedder.dim() {
            return Err(Error::DimensionMismatch { expected: self.embedder.dim(), actual: embedding.dim() });
        }
        let key = self.store.keys().derive(text);
        self.store.put(&key, text, &embedding)?;
        Ok(key)
    }

    /// Best match for `query`; `None` when the index holds nothing scorable.
    pub fn query(&self, query: &str) -> Result<Option<ScoredCandidate>> {
        let q = self.embedder.embed(query)?;
        Retriever::new(&self.store).parallel(self.parallel_scan).retrieve_best(&q)
    }

    pub fn query_top_k(&self, query: &str, k: usize) -> Result<Vec<ScoredCandidate>> {
        let q = self.embedder.embed(query)?;
        Retriever::new(&self.store).parallel(self.parallel_scan).retrieve_top_k(&q, k)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

/// Opens the Redis-backed engine described by `settings`. Relative paths
/// resolve against `base`.
pub fn open(settings: &Settings, base: &Path) -> Result<SearchEngine<RedisKv>> {
    settings.validate()?;
    let kv = RedisKv::connect(&settings.store_address, Duration::from_millis(settings.connect_timeout_ms))?;
    let store = VectorStore::new(kv, settings.key_deriver()?);
    let embedder = get_default_embedder(settings, base)?;
    Ok(SearchEngine::new(store, embedder).with_parallel_scan(settings.parallel_scan))
}
