//! Embedding producer port.

use crate::matching::domain::{Embedding, MatchingDomainError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for embedding producers.
pub type EmbeddingProducerResult<T> = Result<T, EmbeddingProducerError>;

/// Produces fixed-length embeddings for task descriptions and talent names.
///
/// Embeddings are computed once when a record is created and stored with it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProducer: Send + Sync {
    /// Returns the embedding for `text`.
    async fn embed(&self, text: &str) -> EmbeddingProducerResult<Embedding>;
}

/// Errors returned by embedding producers.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingProducerError {
    /// The produced vector failed domain validation.
    #[error(transparent)]
    Invalid(#[from] MatchingDomainError),

    /// The backing model or service failed.
    #[error("embedding backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl EmbeddingProducerError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
