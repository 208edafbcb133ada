//! `PostgreSQL` adapters for matching persistence.

mod models;
mod schema;
mod store;

pub use store::{MatchingPgPool, PostgresMatchingStore};
