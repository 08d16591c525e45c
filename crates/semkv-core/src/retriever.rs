//! Brute-force retrieval: scan every stored record, score it against the
//! query, keep the best.
//!
//! Records that cannot be scored (dimension mismatch, zero magnitude) are
//! logged and excluded. Ties go to the record seen first in scan order, in
//! both the sequential and the parallel path.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::kv::KvStore;
use crate::similarity::cosine_similarity;
use crate::store::VectorStore;
use crate::types::{Embedding, ScoredCandidate, StoredRecord};

pub struct Retriever<'a, K> {
    store: &'a VectorStore<K>,
    parallel: bool,
}

impl<'a, K: KvStore> Retriever<'a, K> {
    pub fn new(store: &'a VectorStore<K>) -> Self {
        Self { store, parallel: false }
    }

    /// Score records on the rayon pool. Results are identical to the sequential scan.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Best match for `query`, or `None` when nothing in the store is scorable.
    pub fn retrieve_best(&self, query: &Embedding) -> Result<Option<ScoredCandidate>> {
        let records = self.store.scan_all()?;
        let best = if self.parallel { best_match_parallel(query, &records) } else { best_match(query, &records) };
        match &best {
            Some(hit) => debug!(records = records.len(), key = %hit.key, score = hit.score, "retrieved best match"),
            None => debug!(records = records.len(), "no scorable records"),
        }
        Ok(best)
    }

    /// Up to `k` candidates by descending score; ties keep scan order.
    pub fn retrieve_top_k(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredCandidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let records = self.store.scan_all()?;
        Ok(if self.parallel { top_k_parallel(query, &records, k) } else { top_k(query, &records, k) })
    }
}

/// Shorthand for `Retriever::new(store).retrieve_best(query)`.
pub fn retrieve_best<K: KvStore>(query: &Embedding, store: &VectorStore<K>) -> Result<Option<ScoredCandidate>> {
    Retriever::new(store).retrieve_best(query)
}

fn score_record(query: &Embedding, record: &StoredRecord) -> Option<f64> {
    match cosine_similarity(query, &record.embedding) {
        Ok(score) => Some(score),
        Err(e) => {
            warn!(key = %record.key, error = %e, "excluding record from ranking");
            None
        }
    }
}

fn candidate(record: &StoredRecord, score: f64) -> ScoredCandidate {
    ScoredCandidate { key: record.key.clone(), text: record.text.clone(), score }
}

/// Sequential selection with a strict greater-than running maximum.
pub fn best_match(query: &Embedding, records: &[StoredRecord]) -> Option<ScoredCandidate> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, record) in records.iter().enumerate() {
        let Some(score) = score_record(query, record) else { continue };
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, score)| candidate(&records[idx], score))
}

/// Same selection as [`best_match`], scored in parallel. Equal scores resolve
/// to the lower scan index, not to whichever thread finished first.
pub fn best_match_parallel(query: &Embedding, records: &[StoredRecord]) -> Option<ScoredCandidate> {
    records
        .par_iter()
        .enumerate()
        .filter_map(|(idx, record)| score_record(query, record).map(|score| (idx, score)))
        .reduce_with(|a, b| if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) { b } else { a })
        .map(|(idx, score)| candidate(&records[idx], score))
}

pub fn top_k(query: &Embedding, records: &[StoredRecord], k: usize) -> Vec<ScoredCandidate> {
    let scored: Vec<(usize, f64)> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| score_record(query, record).map(|score| (idx, score)))
        .collect();
    rank(records, scored, k)
}

/// [`top_k`] with scoring on the rayon pool. The indexed collect keeps scan
/// order, so the ranking matches the sequential one.
pub fn top_k_parallel(query: &Embedding, records: &[StoredRecord], k: usize) -> Vec<ScoredCandidate> {
    let scored: Vec<(usize, f64)> = records
        .par_iter()
        .enumerate()
        .filter_map(|(idx, record)| score_record(query, record).map(|score| (idx, score)))
        .collect();
    rank(records, scored, k)
}

fn rank(records: &[StoredRecord], mut scored: Vec<(usize, f64)>, k: usize) -> Vec<ScoredCandidate> {
    // Stable sort keeps scan order among equal scores.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored.into_iter().map(|(idx, score)| candidate(&records[idx], score)).collect()
}
