//! Job abstraction and the per-job run-lock.

use crate::matching::{
    ports::{ExtensionOracle, MatchingStore},
    services::{CycleError, CycleResult, ExpirationReaper, ExtensionArbiter, MatchingEngine},
};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// A unit of periodic work.
#[async_trait]
pub trait CycleJob: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs one cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] when the cycle aborts; the driver retries on
    /// the next tick.
    async fn run_once(&self) -> CycleResult<()>;
}

#[async_trait]
impl<S, C> CycleJob for MatchingEngine<S, C>
where
    S: MatchingStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "matching"
    }

    async fn run_once(&self) -> CycleResult<()> {
        self.run_cycle().await.map(drop)
    }
}

#[async_trait]
impl<S, O, C> CycleJob for ExtensionArbiter<S, O, C>
where
    S: MatchingStore + 'static,
    O: ExtensionOracle + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "extension"
    }

    async fn run_once(&self) -> CycleResult<()> {
        self.run_cycle().await.map(drop)
    }
}

#[async_trait]
impl<S, C> CycleJob for ExpirationReaper<S, C>
where
    S: MatchingStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "expiration"
    }

    async fn run_once(&self) -> CycleResult<()> {
        self.run_cycle().await.map(drop)
    }
}

/// Result of a single tick.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The cycle ran to completion.
    Completed,
    /// The cycle aborted.
    Failed(CycleError),
    /// A previous run still held the lock.
    Skipped,
}

/// A job paired with its run-lock.
#[derive(Clone)]
pub struct GuardedJob {
    job: Arc<dyn CycleJob>,
    run_lock: Arc<Mutex<()>>,
}

impl GuardedJob {
    /// Wraps `job` with a fresh run-lock.
    #[must_use]
    pub fn new(job: Arc<dyn CycleJob>) -> Self {
        Self {
            job,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the job name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    /// Runs one cycle unless another run of the same job is in flight.
    pub async fn run_if_idle(&self) -> TickOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            debug!(job = self.name(), "previous run still in flight; skipping tick");
            return TickOutcome::Skipped;
        };
        match self.job.run_once().await {
            Ok(()) => TickOutcome::Completed,
            Err(err) => {
                error!(job = self.name(), error = %err, "cycle aborted; retrying next tick");
                TickOutcome::Failed(err)
            }
        }
    }
}
