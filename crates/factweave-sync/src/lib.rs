//! Idempotent sync of conversation events into the knowledge graph.
//!
//! Citations, answer judgments, and generation errors are emitted as
//! [`factweave_core::SyncEvent`]s by request handlers and recorded as graph
//! episodes exactly once per idempotency key. Emission is fire-and-forget.

pub mod idempotency;
pub mod service;

pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
pub use service::SyncService;
