//! Interval scheduling of guarded jobs.

use super::job::{CycleJob, GuardedJob, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Fires each registered job on its own interval until shutdown.
#[derive(Clone, Default)]
pub struct PeriodicDriver {
    schedules: Vec<(GuardedJob, Duration)>,
}

impl PeriodicDriver {
    /// Creates a driver with no jobs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            schedules: Vec::new(),
        }
    }

    /// Registers `job` to run every `period`.
    #[must_use]
    pub fn with_job(mut self, job: Arc<dyn CycleJob>, period: Duration) -> Self {
        self.schedules.push((GuardedJob::new(job), period));
        self
    }

    /// Returns the number of registered jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.schedules.len()
    }

    /// Runs every schedule until `shutdown` is cancelled.
    ///
    /// The first tick of each job fires immediately. Returns once all timers
    /// have stopped and every in-flight run has finished.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut schedules = JoinSet::new();
        for (job, period) in self.schedules {
            info!(job = job.name(), period_ms = period.as_millis(), "starting job schedule");
            schedules.spawn(run_schedule(job, period, shutdown.clone()));
        }
        while let Some(joined) = schedules.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "job schedule terminated abnormally");
            }
        }
        info!("periodic driver stopped");
    }
}

async fn run_schedule(job: GuardedJob, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join(job.name(), joined);
            }
            _ = ticker.tick() => {
                let run = job.clone();
                in_flight.spawn(async move { run.run_if_idle().await });
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        log_join(job.name(), joined);
    }
    info!(job = job.name(), "job schedule drained");
}

fn log_join(name: &'static str, joined: Result<TickOutcome, JoinError>) {
    if let Err(err) = joined {
        error!(job = name, error = %err, "job run panicked");
    }
}
