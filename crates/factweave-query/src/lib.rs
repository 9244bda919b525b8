//! # factweave-query
//!
//! Query understanding: three independent, side-effect-free analyses run
//! on every incoming query.
//!
//! - [`classifier`] — detects tool-specific queries (arithmetic, date/time,
//!   web intent) that skip graph search entirely
//! - [`decomposer`] — splits complex queries (comparisons, question chains,
//!   multi-part) into prioritized sub-queries
//! - [`temporal`] — derives recency/history intent and date bounds

pub mod classifier;
pub mod decomposer;
pub mod temporal;

pub use classifier::{classify, QueryClassification};
pub use decomposer::{decompose, should_decompose};
pub use temporal::detect_temporal_intent;
