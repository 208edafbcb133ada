//! Embedding vectors and the cosine similarity scorer.

use super::MatchingDomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-length numeric vector describing a task or talent.
///
/// Construction rejects empty vectors and non-finite components. Zero
/// magnitude is allowed at construction time and reported by
/// [`cosine_similarity`] instead, since a degenerate vector only matters when
/// it is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    /// Creates a validated embedding.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::EmptyEmbedding`] when `components` is
    /// empty or [`MatchingDomainError::NonFiniteEmbedding`] when any component
    /// is `NaN` or infinite.
    pub fn new(components: Vec<f64>) -> Result<Self, MatchingDomainError> {
        if components.is_empty() {
            return Err(MatchingDomainError::EmptyEmbedding);
        }
        if let Some(index) = components.iter().position(|value| !value.is_finite()) {
            return Err(MatchingDomainError::NonFiniteEmbedding { index });
        }
        Ok(Self(components))
    }

    /// Returns the vector components.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the vector has no components.
    ///
    /// Validated embeddings are never empty; this exists for API symmetry with
    /// [`Embedding::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the Euclidean norm of the vector.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "vector norms are floating point")]
    pub fn magnitude(&self) -> f64 {
        self.0.iter().map(|value| value * value).sum::<f64>().sqrt()
    }

    /// Returns `true` when the vector has zero magnitude.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.magnitude() == 0.0
    }
}

/// Reasons a pair of embeddings cannot be scored.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The two vectors have different lengths.
    #[error("embedding length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the left-hand vector.
        left: usize,
        /// Length of the right-hand vector.
        right: usize,
    },

    /// At least one vector has zero magnitude.
    #[error("embedding has zero magnitude")]
    ZeroMagnitude,
}

/// Computes the cosine similarity of two embeddings.
///
/// The result lies in `[-1.0, 1.0]`; values are clamped to absorb floating
/// point rounding on near-parallel vectors.
///
/// # Errors
///
/// Returns [`EmbeddingError::LengthMismatch`] when the vectors differ in
/// length and [`EmbeddingError::ZeroMagnitude`] when either vector has zero
/// magnitude.
#[expect(clippy::float_arithmetic, reason = "cosine similarity is floating point")]
pub fn cosine_similarity(left: &Embedding, right: &Embedding) -> Result<f64, EmbeddingError> {
    if left.len() != right.len() {
        return Err(EmbeddingError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let left_norm = left.magnitude();
    let right_norm = right.magnitude();
    if left_norm == 0.0 || right_norm == 0.0 {
        return Err(EmbeddingError::ZeroMagnitude);
    }

    let dot: f64 = left
        .as_slice()
        .iter()
        .zip(right.as_slice())
        .map(|(lhs, rhs)| lhs * rhs)
        .sum();
    Ok((dot / (left_norm * right_norm)).clamp(-1.0, 1.0))
}
