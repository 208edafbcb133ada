//! Task aggregate root and its assignment lifecycle flags.

use super::{Embedding, MatchingDomainError, TaskId};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task aggregate root.
///
/// A task is open while it is neither assigned nor completed. The deadline is
/// set when the task is assigned and survives reclamation untouched; it is
/// only meaningful while `assigned` is `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    description: String,
    embedding: Embedding,
    assigned: bool,
    deadline: Option<DateTime<Utc>>,
    completed: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted description.
    pub description: String,
    /// Persisted embedding vector.
    pub embedding: Embedding,
    /// Persisted assignment flag.
    pub assigned: bool,
    /// Persisted deadline, if any.
    pub deadline: Option<DateTime<Utc>>,
    /// Persisted completion flag.
    pub completed: bool,
    /// Persisted optimistic-concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::EmptyDescription`] when the description
    /// is blank.
    pub fn new(
        description: impl Into<String>,
        embedding: Embedding,
        clock: &impl Clock,
    ) -> Result<Self, MatchingDomainError> {
        let raw = description.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MatchingDomainError::EmptyDescription);
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            description: trimmed.to_owned(),
            embedding,
            assigned: false,
            deadline: None,
            completed: false,
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            description: data.description,
            embedding: data.embedding,
            assigned: data.assigned,
            deadline: data.deadline,
            completed: data.completed,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the task embedding.
    #[must_use]
    pub const fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Returns `true` while an assignment is active for the task.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.assigned
    }

    /// Returns the current deadline, if one has ever been set.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns `true` once the task has been submitted.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns the version the task was read at.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when the task is eligible for matching.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.assigned && !self.completed
    }

    /// Returns `true` when the task is assigned, incomplete, and its deadline
    /// lies strictly before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.assigned && !self.completed && self.deadline.is_some_and(|deadline| deadline < now)
    }

    /// Marks the task as assigned with a deadline of `now + window` and
    /// returns that deadline.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::TaskNotOpen`] when the task is already
    /// assigned or completed.
    pub fn assign(
        &mut self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<DateTime<Utc>, MatchingDomainError> {
        if !self.is_open() {
            return Err(MatchingDomainError::TaskNotOpen(self.id));
        }
        let deadline = now + window;
        self.assigned = true;
        self.deadline = Some(deadline);
        self.updated_at = now;
        Ok(deadline)
    }

    /// Pushes the deadline of an assigned task forward by `window`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::TaskNotAssigned`] when no assignment is
    /// active and [`MatchingDomainError::MissingDeadline`] when the assigned
    /// task carries no deadline.
    pub fn extend_deadline(
        &mut self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, MatchingDomainError> {
        if !self.assigned {
            return Err(MatchingDomainError::TaskNotAssigned(self.id));
        }
        let current = self
            .deadline
            .ok_or(MatchingDomainError::MissingDeadline(self.id))?;
        let extended = current + window;
        self.deadline = Some(extended);
        self.updated_at = now;
        Ok(extended)
    }

    /// Returns the task to the open pool so it can be rematched.
    ///
    /// The deadline is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::TaskNotAssigned`] when the task is not
    /// assigned.
    pub fn release(&mut self, now: DateTime<Utc>) -> Result<(), MatchingDomainError> {
        if !self.assigned {
            return Err(MatchingDomainError::TaskNotAssigned(self.id));
        }
        self.assigned = false;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the task as completed.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::TaskAlreadyCompleted`] when the task has
    /// already been submitted.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), MatchingDomainError> {
        if self.completed {
            return Err(MatchingDomainError::TaskAlreadyCompleted(self.id));
        }
        self.completed = true;
        self.updated_at = now;
        Ok(())
    }
}
