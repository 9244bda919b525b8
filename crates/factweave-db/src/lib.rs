//! # factweave-db
//!
//! PostgreSQL metadata store for factweave.
//!
//! This crate provides:
//! - Connection pool management
//! - The document version manager (versioned upload chains, hash dedup)
//! - Free-text and keyword document search for the fallback cascade
//!
//! ## Example
//!
//! ```rust,ignore
//! use factweave_db::Database;
//! use factweave_core::DocumentStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/factweave").await?;
//!     let latest = db.documents.find_latest_version("tenant-1", "report.pdf").await?;
//!     println!("latest version: {:?}", latest.map(|d| d.version));
//!     Ok(())
//! }
//! ```

pub mod documents;
pub mod pool;
pub mod text_search;

pub use documents::DocumentRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};

// Re-export core types
pub use factweave_core::*;

use sqlx::PgPool;

/// Aggregated handle over all repositories backed by one pool.
#[derive(Clone)]
pub struct Database {
    pub documents: DocumentRepository,
    pool: PgPool,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build from an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            documents: DocumentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
