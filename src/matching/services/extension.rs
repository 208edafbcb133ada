//! Arbitration of pending deadline extension requests.

use super::cycle::{CycleResult, skip_or_abort};
use crate::config::{EngineConfig, ExtensionRejectPolicy};
use crate::matching::{
    domain::{Assignment, AssignmentId, Task, TaskId},
    ports::{
        ChangeSet, ExtensionOracle, ExtensionPlea, ExtensionVerdict, MatchingStore, OracleError,
    },
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a single extension request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionResolution {
    /// The deadline moved to the contained instant.
    Approved {
        /// Deadline after the extension.
        new_deadline: DateTime<Utc>,
    },
    /// The request was refused and the assignment stays active.
    RejectedKept,
    /// The request was refused, the assignment failed and the task returned
    /// to the open pool.
    RejectedReclaimed,
    /// The assignment was no longer active; the request was dropped without
    /// consulting the oracle.
    Stale,
}

/// One resolved extension request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionDecision {
    /// Assignment carrying the request.
    pub assignment_id: AssignmentId,
    /// Task whose deadline was under review.
    pub task_id: TaskId,
    /// Outcome.
    pub resolution: ExtensionResolution,
    /// Whether the oracle failed or timed out and the request was rejected
    /// by default.
    pub oracle_unavailable: bool,
}

/// Summary of one arbitration cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionReport {
    /// Requests resolved and committed this cycle.
    pub decisions: Vec<ExtensionDecision>,
    /// Requests left untouched because their task record is missing.
    pub missing_tasks: Vec<AssignmentId>,
    /// Requests left untouched because their task is not in an assigned
    /// state with a deadline.
    pub inconsistent: Vec<AssignmentId>,
    /// Whether the batch was discarded after losing a race with another
    /// writer; every request stays pending for the next cycle.
    pub discarded: bool,
}

impl ExtensionReport {
    /// Number of approved requests.
    #[must_use]
    pub fn approved(&self) -> usize {
        self.decisions
            .iter()
            .filter(|decision| matches!(decision.resolution, ExtensionResolution::Approved { .. }))
            .count()
    }

    /// Number of rejected requests, whatever the reject policy did.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.decisions
            .iter()
            .filter(|decision| {
                matches!(
                    decision.resolution,
                    ExtensionResolution::RejectedKept | ExtensionResolution::RejectedReclaimed
                )
            })
            .count()
    }
}

/// Resolves pending extension requests through an [`ExtensionOracle`].
///
/// Oracle errors and timeouts count as rejections. Every resolved request
/// in a cycle is committed as one unit.
pub struct ExtensionArbiter<S, O, C>
where
    S: MatchingStore,
    O: ExtensionOracle,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    oracle: Arc<O>,
    clock: Arc<C>,
    extension_window: Duration,
    reject_policy: ExtensionRejectPolicy,
    oracle_timeout: std::time::Duration,
}

impl<S, O, C> Clone for ExtensionArbiter<S, O, C>
where
    S: MatchingStore,
    O: ExtensionOracle,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            oracle: Arc::clone(&self.oracle),
            clock: Arc::clone(&self.clock),
            extension_window: self.extension_window.clone(),
            reject_policy: self.reject_policy.clone(),
            oracle_timeout: self.oracle_timeout.clone(),
        }
    }
}

impl<S, O, C> ExtensionArbiter<S, O, C>
where
    S: MatchingStore,
    O: ExtensionOracle,
    C: Clock + Send + Sync,
{
    /// Creates an arbiter.
    #[must_use]
    pub fn new(store: Arc<S>, oracle: Arc<O>, clock: Arc<C>, config: &EngineConfig) -> Self {
        Self {
            store,
            oracle,
            clock,
            extension_window: config.extension_window(),
            reject_policy: config.reject_policy(),
            oracle_timeout: config.oracle_timeout(),
        }
    }

    /// Runs one arbitration cycle over every pending request.
    ///
    /// # Errors
    ///
    /// Returns [`super::CycleError`] when the store cannot be read or the
    /// commit fails for reasons other than contention.
    pub async fn run_cycle(&self) -> CycleResult<ExtensionReport> {
        let now = self.clock.utc();
        let pending = self.store.pending_extensions().await?;
        let mut report = ExtensionReport::default();
        if pending.is_empty() {
            return Ok(report);
        }
        let alternate_available = self.store.count_talents().await? > 1;

        let mut changes = ChangeSet::new();
        let mut decisions = Vec::with_capacity(pending.len());
        for assignment in pending {
            let assignment_id = assignment.id();
            let task_id = assignment.task_id();

            if !assignment.is_active() {
                decisions.push(drop_stale(assignment, now, &mut changes));
                continue;
            }

            let Some(task) = self.store.find_task(task_id).await? else {
                warn!(
                    assignment_id = %assignment_id,
                    task_id = %task_id,
                    "extension request references a missing task; skipping"
                );
                report.missing_tasks.push(assignment_id);
                continue;
            };
            if !task.is_assigned() || task.deadline().is_none() {
                // The reaper may have failed the assignment after it was listed.
                let current = self.store.find_assignment(assignment_id).await?;
                if let Some(released) = current.filter(|current| !current.is_active()) {
                    decisions.push(drop_stale(released, now, &mut changes));
                    continue;
                }
                error!(
                    assignment_id = %assignment_id,
                    task_id = %task_id,
                    assigned = task.is_assigned(),
                    "active assignment points at a task without a running deadline"
                );
                report.inconsistent.push(assignment_id);
                continue;
            }

            let plea = ExtensionPlea::new(assignment.justification(), alternate_available);
            let (verdict, oracle_unavailable) = self.consult(assignment_id, &plea).await;
            let resolution = self.apply(verdict, task, assignment, now, &mut changes);
            match resolution {
                Some(resolution) => decisions.push(ExtensionDecision {
                    assignment_id,
                    task_id,
                    resolution,
                    oracle_unavailable,
                }),
                None => report.inconsistent.push(assignment_id),
            }
        }

        if changes.is_empty() {
            return Ok(report);
        }
        match self.store.commit(changes).await {
            Ok(()) => {
                report.decisions = decisions;
                info!(
                    approved = report.approved(),
                    rejected = report.rejected(),
                    resolved = report.decisions.len(),
                    "extension cycle finished"
                );
            }
            Err(err) => {
                let skipped = skip_or_abort(err)?;
                warn!(error = %skipped, "extension batch discarded; requests stay pending");
                report.discarded = true;
            }
        }
        Ok(report)
    }

    async fn consult(
        &self,
        assignment_id: AssignmentId,
        plea: &ExtensionPlea,
    ) -> (ExtensionVerdict, bool) {
        let answer = tokio::time::timeout(self.oracle_timeout, self.oracle.decide(plea))
            .await
            .unwrap_or(Err(OracleError::Timeout));
        match answer {
            Ok(verdict) => (verdict, false),
            Err(err) => {
                warn!(
                    assignment_id = %assignment_id,
                    timeout_ms = self.oracle_timeout.as_millis(),
                    error = %err,
                    "extension oracle unavailable; rejecting"
                );
                (ExtensionVerdict::Reject, true)
            }
        }
    }

    fn apply(
        &self,
        verdict: ExtensionVerdict,
        mut task: Task,
        mut assignment: Assignment,
        now: DateTime<Utc>,
        changes: &mut ChangeSet,
    ) -> Option<ExtensionResolution> {
        let resolution = match (verdict, self.reject_policy) {
            (ExtensionVerdict::Approve, _) => {
                let new_deadline = task
                    .extend_deadline(self.extension_window, now)
                    .inspect_err(|err| {
                        error!(task_id = %task.id(), error = %err, "deadline extension failed");
                    })
                    .ok()?;
                info!(
                    assignment_id = %assignment.id(),
                    task_id = %task.id(),
                    new_deadline = %new_deadline,
                    "extension approved"
                );
                changes.update_task(task);
                ExtensionResolution::Approved { new_deadline }
            }
            (ExtensionVerdict::Reject, ExtensionRejectPolicy::KeepActive) => {
                info!(assignment_id = %assignment.id(), "extension rejected; assignment kept");
                ExtensionResolution::RejectedKept
            }
            (ExtensionVerdict::Reject, ExtensionRejectPolicy::Reclaim) => {
                let reclaimed = assignment.fail(now).and_then(|()| task.release(now));
                if let Err(err) = reclaimed {
                    error!(
                        assignment_id = %assignment.id(),
                        error = %err,
                        "could not reclaim task after rejected extension"
                    );
                    return None;
                }
                info!(
                    assignment_id = %assignment.id(),
                    task_id = %task.id(),
                    "extension rejected; task reclaimed"
                );
                changes.update_task(task);
                ExtensionResolution::RejectedReclaimed
            }
        };
        assignment.clear_extension_request(now);
        changes.update_assignment(assignment);
        Some(resolution)
    }
}

fn drop_stale(
    mut assignment: Assignment,
    now: DateTime<Utc>,
    changes: &mut ChangeSet,
) -> ExtensionDecision {
    debug!(
        assignment_id = %assignment.id(),
        status = %assignment.status(),
        "dropping extension request on inactive assignment"
    );
    let decision = ExtensionDecision {
        assignment_id: assignment.id(),
        task_id: assignment.task_id(),
        resolution: ExtensionResolution::Stale,
        oracle_unavailable: false,
    };
    assignment.clear_extension_request(now);
    changes.update_assignment(assignment);
    decision
}
