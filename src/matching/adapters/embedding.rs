//! Deterministic hash-derived embedding producer.

use crate::matching::{
    domain::Embedding,
    ports::{EmbeddingProducer, EmbeddingProducerResult},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Default embedding width.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 512;

/// Embedding producer that derives pseudo-random components from SHA-256.
///
/// Components lie in `[0.0, 1.0]`. The same text always yields the same
/// vector, but vectors carry no semantic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates a producer emitting vectors of `dimensions` components.
    ///
    /// A width of zero is raised to one.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions: if dimensions == 0 { 1 } else { dimensions },
        }
    }

    /// Returns the configured width.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Computes the vector for `text` synchronously.
    #[must_use]
    #[expect(clippy::big_endian_bytes, reason = "block counter must hash identically on every host")]
    pub fn components(&self, text: &str) -> Vec<f64> {
        let mut components = Vec::with_capacity(self.dimensions);
        let mut block: u64 = 0;
        while components.len() < self.dimensions {
            let digest = Sha256::new()
                .chain_update(text.as_bytes())
                .chain_update(block.to_be_bytes())
                .finalize();
            for chunk in digest.chunks_exact(4) {
                if components.len() == self.dimensions {
                    break;
                }
                let mut word = [0_u8; 4];
                word.copy_from_slice(chunk);
                components.push(unit_interval(u32::from_be_bytes(word)));
            }
            block += 1;
        }
        components
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

#[expect(clippy::float_arithmetic, reason = "maps a hash word onto [0, 1]")]
fn unit_interval(word: u32) -> f64 {
    f64::from(word) / f64::from(u32::MAX)
}

#[async_trait]
impl EmbeddingProducer for HashEmbedder {
    async fn embed(&self, text: &str) -> EmbeddingProducerResult<Embedding> {
        Ok(Embedding::new(self.components(text))?)
    }
}
