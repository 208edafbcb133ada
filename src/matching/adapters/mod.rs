//! Adapter implementations for the matching ports.

pub mod memory;
pub mod postgres;

mod embedding;
mod gemini;
mod oracle;

pub use embedding::{DEFAULT_EMBEDDING_DIMENSIONS, HashEmbedder};
pub use gemini::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiExtensionOracle, interpret_answer,
    render_review_prompt,
};
pub use oracle::{ScriptedOracle, StaticOracle};
