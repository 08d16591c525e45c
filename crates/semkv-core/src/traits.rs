use crate::error::Result;
use crate::types::Embedding;

/// Text to fixed-dimension vector. Implementations are deterministic for a
/// fixed model and return vectors of length [`Embedder::dim`].
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// One result per input; a failure for one text does not affect the others.
    fn embed_batch(&self, texts: &[String]) -> Vec<Result<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
