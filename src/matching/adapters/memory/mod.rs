//! In-memory adapters for the matching ports.

mod store;

pub use store::InMemoryMatchingStore;
