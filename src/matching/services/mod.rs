//! Application services: the three periodic jobs and record intake.

mod cycle;
mod expiration;
mod extension;
mod intake;
mod matching;

pub use cycle::{CycleError, CycleResult};
pub use expiration::{ExpirationReaper, ExpirationReport, IntegrityViolation, ReclaimedTask};
pub use extension::{
    ExtensionArbiter, ExtensionDecision, ExtensionReport, ExtensionResolution,
};
pub use intake::{DemoSeed, IntakeError, IntakeResult, IntakeService};
pub use matching::{MatchOutcome, MatchingEngine, MatchingReport};
