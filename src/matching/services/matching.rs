//! Similarity matching of open tasks to talent.

use super::cycle::{CycleResult, skip_or_abort};
use crate::config::{EngineConfig, MatchThreshold};
use crate::matching::{
    domain::{
        Assignment, AssignmentId, Embedding, Talent, TalentId, Task, TaskId, cosine_similarity,
    },
    ports::{ChangeSet, MatchingStore},
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A task matched to talent during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Matched task.
    pub task_id: TaskId,
    /// Selected talent.
    pub talent_id: TalentId,
    /// Assignment created for the pair.
    pub assignment_id: AssignmentId,
    /// Similarity of the pair.
    pub score: f64,
    /// Deadline set on the task.
    pub deadline: DateTime<Utc>,
}

/// Summary of one matching cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchingReport {
    /// Tasks that received an assignment.
    pub assigned: Vec<MatchOutcome>,
    /// Tasks with no candidate above the threshold.
    pub unmatched: Vec<TaskId>,
    /// Tasks skipped because a concurrent writer changed them first.
    pub conflicts: Vec<TaskId>,
    /// Open tasks whose embedding has zero magnitude or an unexpected
    /// length.
    pub degenerate_tasks: Vec<TaskId>,
    /// Talent excluded from scoring because their embedding has zero
    /// magnitude or an unexpected length.
    pub degenerate_talents: BTreeSet<TalentId>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    talent_id: TalentId,
    score: f64,
}

/// Assigns each open task to its most similar eligible talent.
///
/// Talents are scored in ascending identifier order and a later talent only
/// replaces the current best on a strictly higher score, so ties go to the
/// lowest identifier. Each assignment is committed with its task update as
/// one unit.
///
/// The expected embedding length is the most common length among the open
/// tasks and talents of the cycle (the shorter length on a tie). Records of
/// any other length, and zero-magnitude records, are reported as degenerate
/// and left out of scoring.
pub struct MatchingEngine<S, C>
where
    S: MatchingStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    threshold: MatchThreshold,
    assignment_window: Duration,
}

impl<S, C> Clone for MatchingEngine<S, C>
where
    S: MatchingStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            threshold: self.threshold.clone(),
            assignment_window: self.assignment_window.clone(),
        }
    }
}

impl<S, C> MatchingEngine<S, C>
where
    S: MatchingStore,
    C: Clock + Send + Sync,
{
    /// Creates a matching engine.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            threshold: config.threshold(),
            assignment_window: config.assignment_window(),
        }
    }

    /// Runs one matching cycle over every open task.
    ///
    /// # Errors
    ///
    /// Returns [`super::CycleError`] when the store cannot be read or a
    /// commit fails for reasons other than contention.
    pub async fn run_cycle(&self) -> CycleResult<MatchingReport> {
        let now = self.clock.utc();
        let open_tasks = self.store.open_tasks().await?;
        let mut talents = self.store.list_talents().await?;
        talents.sort_by_key(Talent::id);
        let exclusions = self.store.failed_talents_by_task().await?;

        let mut report = MatchingReport::default();
        let Some(dimensions) = expected_dimensions(&open_tasks, &talents) else {
            return Ok(report);
        };
        let (healthy, degenerate): (Vec<Talent>, Vec<Talent>) = talents
            .into_iter()
            .partition(|talent| is_scorable(talent.embedding(), dimensions));
        for talent in degenerate {
            warn!(
                talent_id = %talent.id(),
                dimensions = talent.embedding().len(),
                expected = dimensions,
                "talent embedding cannot be scored; excluding"
            );
            report.degenerate_talents.insert(talent.id());
        }

        for task in open_tasks {
            let task_id = task.id();
            if !is_scorable(task.embedding(), dimensions) {
                warn!(
                    task_id = %task_id,
                    dimensions = task.embedding().len(),
                    expected = dimensions,
                    "task embedding cannot be scored; skipping"
                );
                report.degenerate_tasks.push(task_id);
                continue;
            }

            let excluded = exclusions.get(&task_id);
            let best = best_candidate(&task, &healthy, excluded);
            match best {
                Some(candidate) if self.threshold.is_cleared_by(candidate.score) => {
                    self.assign(task, candidate, now, &mut report).await?;
                }
                Some(candidate) => {
                    debug!(
                        task_id = %task_id,
                        best_score = candidate.score,
                        threshold = %self.threshold,
                        "no candidate cleared the threshold"
                    );
                    report.unmatched.push(task_id);
                }
                None => {
                    debug!(task_id = %task_id, "no eligible talent");
                    report.unmatched.push(task_id);
                }
            }
        }

        info!(
            assigned = report.assigned.len(),
            unmatched = report.unmatched.len(),
            conflicts = report.conflicts.len(),
            "matching cycle finished"
        );
        Ok(report)
    }

    async fn assign(
        &self,
        mut task: Task,
        candidate: Candidate,
        now: DateTime<Utc>,
        report: &mut MatchingReport,
    ) -> CycleResult<()> {
        let task_id = task.id();
        let deadline = match task.assign(now, self.assignment_window) {
            Ok(deadline) => deadline,
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "task could not be assigned");
                report.conflicts.push(task_id);
                return Ok(());
            }
        };
        let assignment = Assignment::assigned_at(task_id, candidate.talent_id, now);
        let assignment_id = assignment.id();

        let mut changes = ChangeSet::new();
        changes.update_task(task);
        changes.insert_assignment(assignment);

        match self.store.commit(changes).await {
            Ok(()) => {
                info!(
                    task_id = %task_id,
                    talent_id = %candidate.talent_id,
                    assignment_id = %assignment_id,
                    score = candidate.score,
                    deadline = %deadline,
                    "task assigned"
                );
                report.assigned.push(MatchOutcome {
                    task_id,
                    talent_id: candidate.talent_id,
                    assignment_id,
                    score: candidate.score,
                    deadline,
                });
            }
            Err(err) => {
                let skipped = skip_or_abort(err)?;
                warn!(task_id = %task_id, error = %skipped, "assignment skipped this cycle");
                report.conflicts.push(task_id);
            }
        }
        Ok(())
    }
}

/// Most common embedding length across the cycle's records, shorter length
/// first on a tie.
fn expected_dimensions(tasks: &[Task], talents: &[Talent]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    let lengths = tasks
        .iter()
        .map(|task| task.embedding().len())
        .chain(talents.iter().map(|talent| talent.embedding().len()));
    for length in lengths {
        *counts.entry(length).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(left_len, left_count), (right_len, right_count)| {
            left_count
                .cmp(right_count)
                .then_with(|| right_len.cmp(left_len))
        })
        .map(|(length, _)| length)
}

fn is_scorable(embedding: &Embedding, dimensions: usize) -> bool {
    embedding.len() == dimensions && !embedding.is_degenerate()
}

fn best_candidate(
    task: &Task,
    talents: &[Talent],
    excluded: Option<&BTreeSet<TalentId>>,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for talent in talents {
        if excluded.is_some_and(|set| set.contains(&talent.id())) {
            continue;
        }
        match cosine_similarity(task.embedding(), talent.embedding()) {
            Ok(score) => {
                if best.is_none_or(|current| score > current.score) {
                    best = Some(Candidate {
                        talent_id: talent.id(),
                        score,
                    });
                }
            }
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    talent_id = %talent.id(),
                    error = %err,
                    "pair cannot be scored; skipping"
                );
            }
        }
    }
    best
}
