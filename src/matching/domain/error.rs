//! Error types for matching domain validation and lifecycle guards.

use super::{AssignmentId, TaskId};
use thiserror::Error;

/// Errors returned while constructing or mutating matching domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchingDomainError {
    /// The task description is empty after trimming.
    #[error("task description must not be empty")]
    EmptyDescription,

    /// The talent name is empty after trimming.
    #[error("talent name must not be empty")]
    EmptyTalentName,

    /// The embedding vector has no components.
    #[error("embedding must contain at least one component")]
    EmptyEmbedding,

    /// The embedding vector contains `NaN` or an infinity.
    #[error("embedding component {index} is not a finite number")]
    NonFiniteEmbedding {
        /// Position of the offending component.
        index: usize,
    },

    /// The task is already assigned or completed and cannot be matched.
    #[error("task {0} is not open for assignment")]
    TaskNotOpen(TaskId),

    /// The task has no active assignment.
    #[error("task {0} is not currently assigned")]
    TaskNotAssigned(TaskId),

    /// The task is flagged as assigned but carries no deadline.
    #[error("task {0} is assigned without a deadline")]
    MissingDeadline(TaskId),

    /// The task has already been completed.
    #[error("task {0} is already completed")]
    TaskAlreadyCompleted(TaskId),

    /// Transitioning between two assignment states is invalid.
    #[error("invalid assignment transition for {assignment_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Assignment identifier.
        assignment_id: AssignmentId,
        /// Current status in canonical string form.
        from: String,
        /// Requested status in canonical string form.
        to: String,
    },

    /// Extension requests are only accepted on active assignments.
    #[error("assignment {assignment_id} is {status}; extensions require an active assignment")]
    ExtensionRequiresActiveAssignment {
        /// Assignment identifier.
        assignment_id: AssignmentId,
        /// Current status in canonical string form.
        status: String,
    },
}

/// Error returned while parsing assignment statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown assignment status: {0}")]
pub struct ParseAssignmentStatusError(pub String);
