//! Record intake and lookup operations used by the surrounding application.

use crate::matching::{
    domain::{Assignment, AssignmentId, MatchingDomainError, Talent, Task, TaskId},
    ports::{
        ChangeSet, EmbeddingProducer, EmbeddingProducerError, MatchingStore, StoreError,
        StoreResult,
    },
};
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DEMO_TALENT_COUNT: usize = 3;
const DEMO_TASK_COUNT: usize = 2;

/// Service-level errors for intake operations.
#[derive(Debug, Clone, Error)]
pub enum IntakeError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] MatchingDomainError),
    /// The embedding producer failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingProducerError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for intake operations.
pub type IntakeResult<T> = Result<T, IntakeError>;

/// Records created by [`IntakeService::seed_demo_data`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoSeed {
    /// Talent registered by the seed.
    pub talents: Vec<Talent>,
    /// Tasks created by the seed.
    pub tasks: Vec<Task>,
}

/// Creates tasks and talent, records submissions and extension requests.
#[derive(Clone)]
pub struct IntakeService<S, E, C>
where
    S: MatchingStore,
    E: EmbeddingProducer,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    embedder: Arc<E>,
    clock: Arc<C>,
}

impl<S, E, C> IntakeService<S, E, C>
where
    S: MatchingStore,
    E: EmbeddingProducer,
    C: Clock + Send + Sync,
{
    /// Creates a new intake service.
    #[must_use]
    pub const fn new(store: Arc<S>, embedder: Arc<E>, clock: Arc<C>) -> Self {
        Self {
            store,
            embedder,
            clock,
        }
    }

    /// Creates an open task, computing its embedding once.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Domain`] for a blank description and
    /// [`IntakeError::Embedding`] or [`IntakeError::Store`] when a
    /// collaborator fails.
    pub async fn create_task(&self, description: &str) -> IntakeResult<Task> {
        if description.trim().is_empty() {
            return Err(MatchingDomainError::EmptyDescription.into());
        }
        let embedding = self.embedder.embed(description).await?;
        let task = Task::new(description, embedding, &*self.clock)?;
        self.store.insert_task(&task).await?;
        info!(task_id = %task.id(), "task created");
        Ok(task)
    }

    /// Registers talent, computing its embedding once.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Domain`] for a blank name and
    /// [`IntakeError::Embedding`] or [`IntakeError::Store`] when a
    /// collaborator fails.
    pub async fn register_talent(&self, name: &str) -> IntakeResult<Talent> {
        if name.trim().is_empty() {
            return Err(MatchingDomainError::EmptyTalentName.into());
        }
        let embedding = self.embedder.embed(name).await?;
        let talent = Talent::new(name, embedding, &*self.clock)?;
        self.store.insert_talent(&talent).await?;
        info!(talent_id = %talent.id(), "talent registered");
        Ok(talent)
    }

    /// Lists every task.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Store`] when the store fails.
    pub async fn list_tasks(&self) -> IntakeResult<Vec<Task>> {
        Ok(self.store.list_tasks().await?)
    }

    /// Lists every talent.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Store`] when the store fails.
    pub async fn list_talents(&self) -> IntakeResult<Vec<Talent>> {
        Ok(self.store.list_talents().await?)
    }

    /// Lists every assignment.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Store`] when the store fails.
    pub async fn list_assignments(&self) -> IntakeResult<Vec<Assignment>> {
        Ok(self.store.list_assignments().await?)
    }

    /// Retrieves an assignment.
    ///
    /// Returns `Ok(None)` when no assignment has the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Store`] when the store fails.
    pub async fn find_assignment(&self, id: AssignmentId) -> IntakeResult<Option<Assignment>> {
        let result: StoreResult<Option<Assignment>> = self.store.find_assignment(id).await;
        Ok(result?)
    }

    /// Marks a task as submitted.
    ///
    /// The task and its active assignment, when there is one, are completed
    /// in a single commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] for an unknown task,
    /// [`MatchingDomainError::TaskAlreadyCompleted`] for a repeated
    /// submission, and [`StoreError::VersionConflict`] when a periodic job
    /// changed the task concurrently.
    pub async fn submit_task(&self, task_id: TaskId) -> IntakeResult<Task> {
        let mut task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let now = self.clock.utc();
        task.complete(now)?;

        let mut changes = ChangeSet::new();
        for mut assignment in self.store.active_assignments_for_task(task_id).await? {
            assignment.complete(now)?;
            changes.update_assignment(assignment);
        }
        changes.update_task(task);
        self.store.commit(changes).await?;
        info!(task_id = %task_id, "task submitted");

        self.store
            .find_task(task_id)
            .await?
            .ok_or_else(|| StoreError::TaskNotFound(task_id).into())
    }

    /// Records an extension request on an active assignment.
    ///
    /// A later request replaces an earlier pending one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AssignmentNotFound`] for an unknown assignment
    /// and [`MatchingDomainError::ExtensionRequiresActiveAssignment`] when
    /// the assignment is completed or failed.
    pub async fn request_extension(
        &self,
        assignment_id: AssignmentId,
        reason: &str,
    ) -> IntakeResult<Assignment> {
        let mut assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or(StoreError::AssignmentNotFound(assignment_id))?;
        assignment.request_extension(reason, self.clock.utc())?;

        let mut changes = ChangeSet::new();
        changes.update_assignment(assignment);
        self.store.commit(changes).await?;
        info!(assignment_id = %assignment_id, "extension requested");

        self.store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| StoreError::AssignmentNotFound(assignment_id).into())
    }

    /// Seeds demonstration records.
    ///
    /// Three talents are registered when none exist and two tasks are
    /// created when none exist; each half is skipped independently.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`] when a record cannot be created.
    pub async fn seed_demo_data(&self) -> IntakeResult<DemoSeed> {
        let mut seed = DemoSeed::default();
        if self.store.count_talents().await? == 0 {
            for index in 1..=DEMO_TALENT_COUNT {
                let talent = self.register_talent(&format!("Talent {index}")).await?;
                seed.talents.push(talent);
            }
        }
        if self.store.list_tasks().await?.is_empty() {
            for index in 1..=DEMO_TASK_COUNT {
                let task = self
                    .create_task(&format!("Task {index} description"))
                    .await?;
                seed.tasks.push(task);
            }
        }
        info!(
            talents = seed.talents.len(),
            tasks = seed.tasks.len(),
            "demo data seeded"
        );
        Ok(seed)
    }

    /// Creates a task already assigned to `talent` whose deadline lapsed
    /// `overdue_by` ago.
    ///
    /// Used to demonstrate the expiry reaper.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TalentNotFound`] for unknown talent and
    /// [`IntakeError`] when a record cannot be created.
    pub async fn create_overdue_assignment(
        &self,
        description: &str,
        talent: &Talent,
        overdue_by: Duration,
    ) -> IntakeResult<(Task, Assignment)> {
        let mut task = self.create_task(description).await?;
        let task_id = task.id();
        let assigned_at = self.clock.utc() - overdue_by;
        task.assign(assigned_at, Duration::zero())?;
        let assignment = Assignment::assigned_at(task_id, talent.id(), assigned_at);

        let mut changes = ChangeSet::new();
        changes.update_task(task);
        changes.insert_assignment(assignment.clone());
        self.store.commit(changes).await?;

        let stored = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(StoreError::TaskNotFound(task_id))?;
        Ok((stored, assignment))
    }
}
