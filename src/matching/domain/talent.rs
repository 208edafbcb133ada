//! Talent records: candidate workers that tasks are matched against.

use super::{Embedding, MatchingDomainError, TalentId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Candidate worker. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talent {
    id: TalentId,
    name: String,
    embedding: Embedding,
    created_at: DateTime<Utc>,
}

impl Talent {
    /// Creates a new talent record.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::EmptyTalentName`] when the name is blank.
    pub fn new(
        name: impl Into<String>,
        embedding: Embedding,
        clock: &impl Clock,
    ) -> Result<Self, MatchingDomainError> {
        let raw = name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MatchingDomainError::EmptyTalentName);
        }
        Ok(Self {
            id: TalentId::new(),
            name: trimmed.to_owned(),
            embedding,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a talent from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: TalentId,
        name: String,
        embedding: Embedding,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            embedding,
            created_at,
        }
    }

    /// Returns the talent identifier.
    #[must_use]
    pub const fn id(&self) -> TalentId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the talent embedding.
    #[must_use]
    pub const fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Returns the registration timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
