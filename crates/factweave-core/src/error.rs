//! Error types for factweave.

use thiserror::Error;

/// Result type alias using factweave's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for factweave operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata store operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// A document with this filename already exists for the tenant;
    /// the caller must go through the update (new version) flow.
    #[error("Document already exists: {0}")]
    DocumentExists(String),

    /// A byte-identical document (same content hash) already exists
    /// for the tenant.
    #[error("Duplicate document: {0}")]
    DuplicateDocument(String),

    /// All ingestion attempts for a document were exhausted
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Graph-service RPC failed
    #[error("Graph service error: {0}")]
    Graph(String),

    /// Text extraction failed (unsupported or corrupt input)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Search operation failed
    #[error("Search error: {0}")]
    Search(String),

    /// Object storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a failure is transient and worth retrying.
    ///
    /// Only network-facing failures (graph RPC, HTTP) qualify; conflicts
    /// and validation failures never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Graph(_) | Error::Request(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
