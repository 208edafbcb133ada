//! Unit tests for the matching module.
