//! Similarity matching and assignment lifecycle.
//!
//! Open tasks are matched to the most similar talent, pending deadline
//! extensions are arbitrated by an external oracle, and lapsed assignments
//! are failed so their tasks can be rematched. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Periodic jobs and intake operations in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
