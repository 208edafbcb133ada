//! Talentflow: similarity-based task assignment with deadline arbitration.
//!
//! Tasks are matched to talent by cosine similarity of their embeddings.
//! Three periodic jobs keep assignments moving: matching open tasks,
//! resolving deadline extension requests through an external oracle, and
//! reclaiming tasks whose deadline has lapsed.
//!
//! # Architecture
//!
//! Talentflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the store, embedder and oracle
//! - **Adapters**: In-memory and `PostgreSQL` stores, a hash embedder, and
//!   static, scripted and Gemini-backed oracles
//!
//! # Modules
//!
//! - [`matching`]: Domain, ports, adapters, and the periodic jobs
//! - [`config`]: Engine policy and cadence settings
//! - [`driver`]: Interval scheduling with per-job run-locks

pub mod config;
pub mod driver;
pub mod matching;
