//! Port contracts for the matching engine.
//!
//! Ports define infrastructure-agnostic interfaces used by matching services.

pub mod embedder;
pub mod oracle;
pub mod store;

pub use embedder::{EmbeddingProducer, EmbeddingProducerError, EmbeddingProducerResult};
pub use oracle::{ExtensionOracle, ExtensionPlea, ExtensionVerdict, OracleError, OracleResult};
pub use store::{ChangeSet, EntityKind, ExclusionSets, MatchingStore, StoreError, StoreResult};

#[cfg(test)]
pub use embedder::MockEmbeddingProducer;
#[cfg(test)]
pub use oracle::MockExtensionOracle;
#[cfg(test)]
pub use store::MockMatchingStore;
