//! # factweave-graph
//!
//! Typed HTTP client for the external knowledge-graph service, plus a
//! deterministic mock implementation for tests.
//!
//! Every RPC has an explicit request/response struct validated at the
//! boundary; nothing loosely typed crosses the wire layer.

pub mod client;
pub mod mock;
pub mod wire;

pub use client::{HttpGraphClient, DEFAULT_GRAPH_URL};
pub use mock::MockGraphService;
