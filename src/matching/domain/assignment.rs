//! Assignment join entity and its status state machine.

use super::{AssignmentId, MatchingDomainError, ParseAssignmentStatusError, TalentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Justification used when an extension request carries no reason.
pub const NO_REASON_PROVIDED: &str = "No reason provided";

/// Assignment lifecycle status.
///
/// `Assigned` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// The talent is working on the task.
    Assigned,
    /// The task was submitted.
    Completed,
    /// The assignment lapsed or was revoked.
    Failed,
}

impl AssignmentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` when moving from `self` to `target` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Assigned, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AssignmentStatus {
    type Error = ParseAssignmentStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseAssignmentStatusError(value.to_owned())),
        }
    }
}

/// Records that a talent was given a task, and how that ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    id: AssignmentId,
    task_id: TaskId,
    talent_id: TalentId,
    status: AssignmentStatus,
    extension_requested: bool,
    extension_reason: String,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAssignmentData {
    /// Persisted assignment identifier.
    pub id: AssignmentId,
    /// Referenced task.
    pub task_id: TaskId,
    /// Referenced talent.
    pub talent_id: TalentId,
    /// Persisted status.
    pub status: AssignmentStatus,
    /// Whether an extension request is pending.
    pub extension_requested: bool,
    /// Reason attached to the pending request.
    pub extension_reason: String,
    /// Persisted optimistic-concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    /// Creates an active assignment stamped with an explicit time.
    #[must_use]
    pub fn assigned_at(task_id: TaskId, talent_id: TalentId, at: DateTime<Utc>) -> Self {
        Self {
            id: AssignmentId::new(),
            task_id,
            talent_id,
            status: AssignmentStatus::Assigned,
            extension_requested: false,
            extension_reason: String::new(),
            version: 0,
            created_at: at,
            updated_at: at,
        }
    }

    /// Reconstructs an assignment from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAssignmentData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            talent_id: data.talent_id,
            status: data.status,
            extension_requested: data.extension_requested,
            extension_reason: data.extension_reason,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub const fn id(&self) -> AssignmentId {
        self.id
    }

    /// Returns the referenced task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the referenced talent.
    #[must_use]
    pub const fn talent_id(&self) -> TalentId {
        self.talent_id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> AssignmentStatus {
        self.status
    }

    /// Returns `true` while the status is `Assigned`.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, AssignmentStatus::Assigned)
    }

    /// Returns `true` while an extension request awaits arbitration.
    #[must_use]
    pub const fn extension_requested(&self) -> bool {
        self.extension_requested
    }

    /// Returns the reason attached to the pending extension request.
    #[must_use]
    pub fn extension_reason(&self) -> &str {
        &self.extension_reason
    }

    /// Returns the text handed to the extension oracle.
    #[must_use]
    pub fn justification(&self) -> &str {
        if self.extension_reason.trim().is_empty() {
            NO_REASON_PROVIDED
        } else {
            &self.extension_reason
        }
    }

    /// Returns the version the assignment was read at.
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

    /// Marks the assignment as failed.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::InvalidStatusTransition`] when the
    /// assignment is already terminal.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), MatchingDomainError> {
        self.transition_to(AssignmentStatus::Failed, now)
    }

    /// Marks the assignment as completed.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::InvalidStatusTransition`] when the
    /// assignment is already terminal.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), MatchingDomainError> {
        self.transition_to(AssignmentStatus::Completed, now)
    }

    /// Records a pending extension request, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingDomainError::ExtensionRequiresActiveAssignment`] when
    /// the assignment is terminal.
    pub fn request_extension(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingDomainError> {
        if !self.is_active() {
            return Err(MatchingDomainError::ExtensionRequiresActiveAssignment {
                assignment_id: self.id,
                status: self.status.as_str().to_owned(),
            });
        }
        self.extension_requested = true;
        self.extension_reason = reason.into().trim().to_owned();
        self.updated_at = now;
        Ok(())
    }

    /// Clears the pending extension request.
    pub fn clear_extension_request(&mut self, now: DateTime<Utc>) {
        self.extension_requested = false;
        self.extension_reason.clear();
        self.updated_at = now;
    }

    fn transition_to(
        &mut self,
        target: AssignmentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(MatchingDomainError::InvalidStatusTransition {
                assignment_id: self.id,
                from: self.status.as_str().to_owned(),
                to: target.as_str().to_owned(),
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}
