//! Shared world state for matching lifecycle scenarios.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, TimeZone, Utc};
use eyre::{WrapErr, eyre};
use mockable::Clock;
use rstest::fixture;
use talentflow::config::EngineConfig;
use talentflow::matching::{
    adapters::{ScriptedOracle, memory::InMemoryMatchingStore},
    domain::{AssignmentId, Embedding, Talent, Task},
    ports::{ExtensionVerdict, MatchingStore},
};

/// Clock frozen at the scenario start.
#[derive(Debug)]
pub struct FrozenClock {
    now: Mutex<DateTime<Utc>>,
}

impl FrozenClock {
    fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }
}

impl Clock for FrozenClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scenario world for matching behaviour tests.
pub struct MatchingWorld {
    /// Store shared by every cycle.
    pub store: Arc<InMemoryMatchingStore>,
    /// Clock shared by every cycle.
    pub clock: Arc<FrozenClock>,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Oracle consulted by the extension cycle.
    pub oracle: Arc<ScriptedOracle>,
    /// Registered talent by name.
    pub talents: HashMap<String, Talent>,
    /// Task under test.
    pub task: Option<Task>,
    /// Assignment under test.
    pub assignment_id: Option<AssignmentId>,
}

impl MatchingWorld {
    /// Creates a world with an empty store and a rejecting oracle.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
            .single()
            .unwrap_or_default();
        Self {
            store: Arc::new(InMemoryMatchingStore::new()),
            clock: Arc::new(FrozenClock::at(now)),
            config: EngineConfig::default(),
            oracle: Arc::new(ScriptedOracle::new(ExtensionVerdict::Reject)),
            talents: HashMap::new(),
            task: None,
            assignment_id: None,
        }
    }

    /// Current scenario time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Looks up registered talent by name.
    pub fn talent(&self, name: &str) -> Result<&Talent, eyre::Report> {
        self.talents
            .get(name)
            .ok_or_else(|| eyre!("no talent named '{name}' in scenario world"))
    }

    /// Re-reads the task under test from the store.
    pub fn stored_task(&self) -> Result<Task, eyre::Report> {
        let task_id = self
            .task
            .as_ref()
            .map(Task::id)
            .ok_or_else(|| eyre!("no task in scenario world"))?;
        run_async(self.store.find_task(task_id))
            .wrap_err("load task")?
            .ok_or_else(|| eyre!("task {task_id} missing from store"))
    }
}

impl Default for MatchingWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> MatchingWorld {
    MatchingWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Parses a comma-separated embedding such as `"1.0, 0.0"`.
pub fn parse_embedding(raw: &str) -> Result<Embedding, eyre::Report> {
    let components = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .wrap_err_with(|| format!("parse embedding '{raw}'"))?;
    Embedding::new(components).wrap_err("build embedding")
}
