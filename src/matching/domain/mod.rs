//! Domain model for similarity matching and assignment lifecycle.
//!
//! Tasks, talent, and the assignments joining them are plain values here.
//! Persistence, embedding generation, and extension arbitration live behind
//! ports.

mod assignment;
mod embedding;
mod error;
mod ids;
mod talent;
mod task;

pub use assignment::{
    Assignment, AssignmentStatus, NO_REASON_PROVIDED, PersistedAssignmentData,
};
pub use embedding::{Embedding, EmbeddingError, cosine_similarity};
pub use error::{MatchingDomainError, ParseAssignmentStatusError};
pub use ids::{AssignmentId, TalentId, TaskId};
pub use talent::Talent;
pub use task::{PersistedTaskData, Task};
