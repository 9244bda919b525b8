//! # factweave-ingest
//!
//! Chunking engine and ingestion pipeline.
//!
//! Turns raw uploaded content into versioned, chunked graph episodes with
//! bulk/sequential/retry semantics and partial-success handling.

pub mod chunking;
pub mod pipeline;

pub use chunking::{chunk_code, chunk_text, ChunkerConfig};
pub use pipeline::{IngestConfig, IngestOutcome, IngestionPipeline};
