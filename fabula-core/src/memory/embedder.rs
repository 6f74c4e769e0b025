//! Embedder trait: produces vectors from text for semantic memory search.

use async_trait::async_trait;

use crate::memory::error::StoreError;

/// Produces fixed-size float vectors from text. Implementations wrap OpenAI,
/// a local model, or a deterministic mock for tests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text into a vector of dimension [`Embedder::dimension`].
    /// Returns one vector per input text in the same order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError>;

    /// Vector dimension returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;
}
