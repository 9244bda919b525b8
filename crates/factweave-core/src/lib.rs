//! # factweave-core
//!
//! Core types, traits, and abstractions for the factweave GraphRAG engine.
//!
//! This crate provides the foundational data structures, collaborator
//! contracts, and retry machinery that other factweave crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod retry;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use retry::{retry, RetryPolicy};
pub use traits::*;
