//! Step definitions for matching lifecycle scenarios.

pub mod given;
pub mod then;
pub mod world;
