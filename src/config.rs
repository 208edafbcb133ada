//! Engine configuration.
//!
//! Every tunable policy of the periodic engine lives in [`EngineConfig`]:
//! the similarity threshold, the assignment and extension windows, the
//! behaviour on a rejected extension, the oracle timeout, and the cadence of
//! the three jobs. Values come from [`Default`], the `with_*` builders, or
//! [`EngineArgs`], which reads command-line flags and `TALENTFLOW_*`
//! environment variables.

use chrono::Duration as WindowDuration;
use clap::Parser;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the match threshold.
pub const ENV_MATCH_THRESHOLD: &str = "TALENTFLOW_MATCH_THRESHOLD";
/// Environment variable holding the assignment window in seconds.
pub const ENV_ASSIGNMENT_WINDOW_SECS: &str = "TALENTFLOW_ASSIGNMENT_WINDOW_SECS";
/// Environment variable holding the extension window in seconds.
pub const ENV_EXTENSION_WINDOW_SECS: &str = "TALENTFLOW_EXTENSION_WINDOW_SECS";
/// Environment variable holding the reject policy.
pub const ENV_REJECT_POLICY: &str = "TALENTFLOW_REJECT_POLICY";
/// Environment variable holding the oracle timeout in milliseconds.
pub const ENV_ORACLE_TIMEOUT_MS: &str = "TALENTFLOW_ORACLE_TIMEOUT_MS";
/// Environment variable holding the matching interval in seconds.
pub const ENV_MATCH_INTERVAL_SECS: &str = "TALENTFLOW_MATCH_INTERVAL_SECS";
/// Environment variable holding the extension arbitration interval in seconds.
pub const ENV_EXTENSION_INTERVAL_SECS: &str = "TALENTFLOW_EXTENSION_INTERVAL_SECS";
/// Environment variable holding the expiry reaping interval in seconds.
pub const ENV_EXPIRY_INTERVAL_SECS: &str = "TALENTFLOW_EXPIRY_INTERVAL_SECS";

const DEFAULT_THRESHOLD: f64 = 0.70;
const DEFAULT_WINDOW_HOURS: i64 = 24;
const DEFAULT_WINDOW_SECS: i64 = DEFAULT_WINDOW_HOURS * 3600;
const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_millis(DEFAULT_ORACLE_TIMEOUT_MS);
const DEFAULT_JOB_INTERVAL_SECS: u64 = 60;
const DEFAULT_JOB_INTERVAL: Duration = Duration::from_secs(DEFAULT_JOB_INTERVAL_SECS);

/// Errors raised while building configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The threshold is outside the cosine similarity range.
    #[error("match threshold must be a finite value in [-1, 1], got {0}")]
    ThresholdOutOfRange(f64),

    /// A window or interval is zero or negative.
    #[error("{name} must be positive")]
    NonPositiveDuration {
        /// Setting name.
        name: &'static str,
    },

    /// A reject policy name was not recognised.
    #[error("unknown extension reject policy: {0}")]
    UnknownRejectPolicy(String),

    /// A flag or environment variable could not be parsed.
    #[error("invalid engine arguments: {0}")]
    InvalidArguments(String),

    /// A window is too large to represent.
    #[error("{name} is out of range")]
    DurationOutOfRange {
        /// Setting name.
        name: &'static str,
    },
}

/// Minimum similarity a candidate must strictly exceed to be assigned.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MatchThreshold(f64);

impl MatchThreshold {
    /// Creates a validated threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ThresholdOutOfRange`] when `value` is not a
    /// finite number in `[-1, 1]`.
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_finite() && (-1.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::ThresholdOutOfRange(value))
        }
    }

    /// Returns the raw threshold.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` when `score` clears the threshold.
    #[must_use]
    pub const fn is_cleared_by(self, score: f64) -> bool {
        score > self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl fmt::Display for MatchThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happens to an assignment whose extension request is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtensionRejectPolicy {
    /// The assignment stays active and the deadline is unchanged.
    #[default]
    KeepActive,
    /// The assignment fails and the task returns to the open pool.
    Reclaim,
}

impl ExtensionRejectPolicy {
    /// Returns the canonical configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepActive => "keep-active",
            Self::Reclaim => "reclaim",
        }
    }
}

impl fmt::Display for ExtensionRejectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtensionRejectPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "keep-active" | "keep" => Ok(Self::KeepActive),
            "reclaim" => Ok(Self::Reclaim),
            _ => Err(ConfigError::UnknownRejectPolicy(value.to_owned())),
        }
    }
}

/// Raw engine settings from command-line flags or `TALENTFLOW_*`
/// variables.
///
/// Flags win over variables; unset settings take their defaults. Convert
/// with [`EngineConfig::try_from`] to validate.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "talentflow")]
#[command(about = "Matches tasks to talent and keeps assignments moving")]
pub struct EngineArgs {
    /// Similarity a candidate must strictly exceed, in [-1, 1].
    #[arg(long, env = ENV_MATCH_THRESHOLD, default_value_t = DEFAULT_THRESHOLD)]
    pub match_threshold: f64,

    /// Deadline window granted on assignment, in seconds.
    #[arg(long, env = ENV_ASSIGNMENT_WINDOW_SECS, default_value_t = DEFAULT_WINDOW_SECS)]
    pub assignment_window_secs: i64,

    /// Deadline extension granted on approval, in seconds.
    #[arg(long, env = ENV_EXTENSION_WINDOW_SECS, default_value_t = DEFAULT_WINDOW_SECS)]
    pub extension_window_secs: i64,

    /// What a rejected extension does: `keep-active` or `reclaim`.
    #[arg(long, env = ENV_REJECT_POLICY, default_value_t = ExtensionRejectPolicy::KeepActive)]
    pub reject_policy: ExtensionRejectPolicy,

    /// Bound on a single oracle call, in milliseconds.
    #[arg(long, env = ENV_ORACLE_TIMEOUT_MS, default_value_t = DEFAULT_ORACLE_TIMEOUT_MS)]
    pub oracle_timeout_ms: u64,

    /// Matching cadence, in seconds.
    #[arg(long, env = ENV_MATCH_INTERVAL_SECS, default_value_t = DEFAULT_JOB_INTERVAL_SECS)]
    pub match_interval_secs: u64,

    /// Extension arbitration cadence, in seconds.
    #[arg(long, env = ENV_EXTENSION_INTERVAL_SECS, default_value_t = DEFAULT_JOB_INTERVAL_SECS)]
    pub extension_interval_secs: u64,

    /// Expiry reaping cadence, in seconds.
    #[arg(long, env = ENV_EXPIRY_INTERVAL_SECS, default_value_t = DEFAULT_JOB_INTERVAL_SECS)]
    pub expiry_interval_secs: u64,
}

/// Policy and cadence settings for the periodic engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    threshold: MatchThreshold,
    assignment_window: WindowDuration,
    extension_window: WindowDuration,
    reject_policy: ExtensionRejectPolicy,
    oracle_timeout: Duration,
    match_interval: Duration,
    extension_interval: Duration,
    expiry_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: MatchThreshold::default(),
            assignment_window: WindowDuration::hours(DEFAULT_WINDOW_HOURS),
            extension_window: WindowDuration::hours(DEFAULT_WINDOW_HOURS),
            reject_policy: ExtensionRejectPolicy::default(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            match_interval: DEFAULT_JOB_INTERVAL,
            extension_interval: DEFAULT_JOB_INTERVAL,
            expiry_interval: DEFAULT_JOB_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Reads configuration from `TALENTFLOW_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a set variable fails to parse or
    /// validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let args = EngineArgs::try_parse_from(["talentflow"])
            .map_err(|err| ConfigError::InvalidArguments(err.to_string()))?;
        Self::try_from(args)
    }

    /// Sets the match threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: MatchThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the deadline window granted on assignment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] for zero or negative
    /// windows.
    pub fn with_assignment_window(mut self, window: WindowDuration) -> Result<Self, ConfigError> {
        self.assignment_window = positive_window("assignment window", window)?;
        Ok(self)
    }

    /// Sets the deadline extension granted on approval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] for zero or negative
    /// windows.
    pub fn with_extension_window(mut self, window: WindowDuration) -> Result<Self, ConfigError> {
        self.extension_window = positive_window("extension window", window)?;
        Ok(self)
    }

    /// Sets the reject policy.
    #[must_use]
    pub const fn with_reject_policy(mut self, policy: ExtensionRejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    /// Sets the bound on a single oracle call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] for a zero timeout.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        self.oracle_timeout = positive_interval("oracle timeout", timeout)?;
        Ok(self)
    }

    /// Sets the matching cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] for a zero interval.
    pub fn with_match_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        self.match_interval = positive_interval("match interval", interval)?;
        Ok(self)
    }

    /// Sets the extension arbitration cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] for a zero interval.
    pub fn with_extension_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        self.extension_interval = positive_interval("extension interval", interval)?;
        Ok(self)
    }

    /// Sets the expiry reaping cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveDuration`] for a zero interval.
    pub fn with_expiry_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        self.expiry_interval = positive_interval("expiry interval", interval)?;
        Ok(self)
    }

    /// Returns the match threshold.
    #[must_use]
    pub const fn threshold(&self) -> MatchThreshold {
        self.threshold
    }

    /// Returns the deadline window granted on assignment.
    #[must_use]
    pub const fn assignment_window(&self) -> WindowDuration {
        self.assignment_window
    }

    /// Returns the deadline extension granted on approval.
    #[must_use]
    pub const fn extension_window(&self) -> WindowDuration {
        self.extension_window
    }

    /// Returns the reject policy.
    #[must_use]
    pub const fn reject_policy(&self) -> ExtensionRejectPolicy {
        self.reject_policy
    }

    /// Returns the oracle timeout.
    #[must_use]
    pub const fn oracle_timeout(&self) -> Duration {
        self.oracle_timeout
    }

    /// Returns the matching cadence.
    #[must_use]
    pub const fn match_interval(&self) -> Duration {
        self.match_interval
    }

    /// Returns the extension arbitration cadence.
    #[must_use]
    pub const fn extension_interval(&self) -> Duration {
        self.extension_interval
    }

    /// Returns the expiry reaping cadence.
    #[must_use]
    pub const fn expiry_interval(&self) -> Duration {
        self.expiry_interval
    }
}

impl TryFrom<EngineArgs> for EngineConfig {
    type Error = ConfigError;

    fn try_from(args: EngineArgs) -> Result<Self, Self::Error> {
        Self::default()
            .with_threshold(MatchThreshold::new(args.match_threshold)?)
            .with_assignment_window(seconds("assignment window", args.assignment_window_secs)?)?
            .with_extension_window(seconds("extension window", args.extension_window_secs)?)?
            .with_reject_policy(args.reject_policy)
            .with_oracle_timeout(Duration::from_millis(args.oracle_timeout_ms))?
            .with_match_interval(Duration::from_secs(args.match_interval_secs))?
            .with_extension_interval(Duration::from_secs(args.extension_interval_secs))?
            .with_expiry_interval(Duration::from_secs(args.expiry_interval_secs))
    }
}

fn seconds(name: &'static str, secs: i64) -> Result<WindowDuration, ConfigError> {
    WindowDuration::try_seconds(secs).ok_or(ConfigError::DurationOutOfRange { name })
}

fn positive_window(
    name: &'static str,
    window: WindowDuration,
) -> Result<WindowDuration, ConfigError> {
    if window > WindowDuration::zero() {
        Ok(window)
    } else {
        Err(ConfigError::NonPositiveDuration { name })
    }
}

fn positive_interval(name: &'static str, interval: Duration) -> Result<Duration, ConfigError> {
    if interval.is_zero() {
        Err(ConfigError::NonPositiveDuration { name })
    } else {
        Ok(interval)
    }
}
