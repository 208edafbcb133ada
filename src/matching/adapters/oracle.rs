//! In-process extension oracles for offline runs and tests.

use crate::matching::ports::{
    ExtensionOracle, ExtensionPlea, ExtensionVerdict, OracleError, OracleResult,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Oracle that answers every plea with the same verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticOracle {
    verdict: ExtensionVerdict,
}

impl StaticOracle {
    /// Creates an oracle that always returns `verdict`.
    #[must_use]
    pub const fn new(verdict: ExtensionVerdict) -> Self {
        Self { verdict }
    }

    /// Oracle that approves everything.
    #[must_use]
    pub const fn approving() -> Self {
        Self::new(ExtensionVerdict::Approve)
    }

    /// Oracle that rejects everything.
    #[must_use]
    pub const fn rejecting() -> Self {
        Self::new(ExtensionVerdict::Reject)
    }
}

#[async_trait]
impl ExtensionOracle for StaticOracle {
    async fn decide(&self, _plea: &ExtensionPlea) -> OracleResult<ExtensionVerdict> {
        Ok(self.verdict)
    }
}

/// Oracle replaying queued answers and recording every plea it receives.
///
/// Once the queue is drained it falls back to the configured default
/// verdict. An optional delay lets tests exercise the arbiter's timeout.
#[derive(Debug, Clone)]
pub struct ScriptedOracle {
    state: Arc<Mutex<ScriptedOracleState>>,
    fallback: ExtensionVerdict,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct ScriptedOracleState {
    answers: VecDeque<OracleResult<ExtensionVerdict>>,
    received: Vec<ExtensionPlea>,
}

impl ScriptedOracle {
    /// Creates an oracle with an empty script.
    #[must_use]
    pub fn new(fallback: ExtensionVerdict) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedOracleState::default())),
            fallback,
            delay: None,
        }
    }

    /// Delays every answer by `delay`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues an answer.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Transport`] when the script lock is poisoned.
    pub fn push(&self, answer: OracleResult<ExtensionVerdict>) -> OracleResult<()> {
        self.lock()?.answers.push_back(answer);
        Ok(())
    }

    /// Returns the pleas received so far.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Transport`] when the script lock is poisoned.
    pub fn received(&self) -> OracleResult<Vec<ExtensionPlea>> {
        Ok(self.lock()?.received.clone())
    }

    fn lock(&self) -> OracleResult<std::sync::MutexGuard<'_, ScriptedOracleState>> {
        self.state
            .lock()
            .map_err(|err| OracleError::transport(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl ExtensionOracle for ScriptedOracle {
    async fn decide(&self, plea: &ExtensionPlea) -> OracleResult<ExtensionVerdict> {
        let answer = {
            let mut state = self.lock()?;
            state.received.push(plea.clone());
            state.answers.pop_front()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        answer.unwrap_or(Ok(self.fallback))
    }
}
