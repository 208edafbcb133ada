//! Reclamation of tasks whose deadline has lapsed.

use super::cycle::{CycleResult, skip_or_abort};
use crate::matching::{
    domain::{Assignment, AssignmentId, TalentId, Task, TaskId},
    ports::{ChangeSet, MatchingStore},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A task returned to the open pool after its deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimedTask {
    /// Reclaimed task.
    pub task_id: TaskId,
    /// Assignment marked as failed.
    pub assignment_id: AssignmentId,
    /// Talent that missed the deadline.
    pub talent_id: TalentId,
}

/// An expired task whose active assignments break the one-active rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityViolation {
    /// Affected task.
    pub task_id: TaskId,
    /// Number of active assignments found; anything but one.
    pub active_assignments: usize,
}

/// Summary of one expiry cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirationReport {
    /// Tasks reclaimed and committed.
    pub reclaimed: Vec<ReclaimedTask>,
    /// Expired tasks with zero or several active assignments.
    pub violations: Vec<IntegrityViolation>,
    /// Tasks skipped because a concurrent writer changed them first.
    pub conflicts: Vec<TaskId>,
}

/// Fails the active assignment of every expired task and frees the task.
///
/// A task is expired when it is assigned, not completed, and its deadline
/// lies strictly before the cycle time. Each reclaim is committed as one
/// unit.
pub struct ExpirationReaper<S, C>
where
    S: MatchingStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for ExpirationReaper<S, C>
where
    S: MatchingStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> ExpirationReaper<S, C>
where
    S: MatchingStore,
    C: Clock + Send + Sync,
{
    /// Creates a reaper.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Runs one expiry cycle.
    ///
    /// # Errors
    ///
    /// Returns [`super::CycleError`] when the store cannot be read or a
    /// commit fails for reasons other than contention.
    pub async fn run_cycle(&self) -> CycleResult<ExpirationReport> {
        let now = self.clock.utc();
        let expired = self.store.expired_tasks(now).await?;
        let mut report = ExpirationReport::default();

        for task in expired {
            let task_id = task.id();
            let active = self.store.active_assignments_for_task(task_id).await?;
            match <[Assignment; 1]>::try_from(active) {
                Ok([assignment]) => self.reclaim(task, assignment, now, &mut report).await?,
                Err(found) => {
                    error!(
                        task_id = %task_id,
                        active_assignments = found.len(),
                        "expired task does not have exactly one active assignment"
                    );
                    report.violations.push(IntegrityViolation {
                        task_id,
                        active_assignments: found.len(),
                    });
                }
            }
        }

        info!(
            reclaimed = report.reclaimed.len(),
            violations = report.violations.len(),
            conflicts = report.conflicts.len(),
            "expiry cycle finished"
        );
        Ok(report)
    }

    async fn reclaim(
        &self,
        mut task: Task,
        mut assignment: Assignment,
        now: DateTime<Utc>,
        report: &mut ExpirationReport,
    ) -> CycleResult<()> {
        let task_id = task.id();
        let reclaimed = ReclaimedTask {
            task_id,
            assignment_id: assignment.id(),
            talent_id: assignment.talent_id(),
        };
        if let Err(err) = assignment.fail(now).and_then(|()| task.release(now)) {
            warn!(task_id = %task_id, error = %err, "expired task could not be reclaimed");
            report.conflicts.push(task_id);
            return Ok(());
        }

        let mut changes = ChangeSet::new();
        changes.update_assignment(assignment);
        changes.update_task(task);
        match self.store.commit(changes).await {
            Ok(()) => {
                info!(
                    task_id = %task_id,
                    assignment_id = %reclaimed.assignment_id,
                    talent_id = %reclaimed.talent_id,
                    "deadline lapsed; task reclaimed"
                );
                report.reclaimed.push(reclaimed);
            }
            Err(err) => {
                let skipped = skip_or_abort(err)?;
                warn!(task_id = %task_id, error = %skipped, "reclaim skipped this cycle");
                report.conflicts.push(task_id);
            }
        }
        Ok(())
    }
}
