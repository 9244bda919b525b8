//! Document version manager.
//!
//! Documents are versioned: re-uploading a filename creates a new row that
//! links back to its predecessor via `parent_id`, with a strictly increasing
//! version number. Byte-identical re-uploads are rejected per tenant through
//! the content-hash uniqueness constraint.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use factweave_core::{defaults, Document, DocumentHit, DocumentStore, Error, NewDocument, Result};

use crate::escape_like;
use crate::text_search::websearch_query;

/// Unique-violation SQLSTATE used to map hash clashes to typed errors.
const UNIQUE_VIOLATION: &str = "23505";

/// Repository for versioned document rows.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    /// Create a new document repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All versions of a filename for a tenant, newest first.
    pub async fn list_versions(&self, tenant_id: &str, filename: &str) -> Result<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, tenant_id, filename, file_type, storage_path, content_hash,
                   extracted_text, processed, episode_ids, version, parent_id,
                   metadata, created_at_utc
            FROM documents
            WHERE tenant_id = $1 AND filename = $2
            ORDER BY version DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filename)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    #[instrument(skip(self), fields(subsystem = "db", component = "documents"))]
    async fn find_latest_version(
        &self,
        tenant_id: &str,
        filename: &str,
    ) -> Result<Option<Document>> {
        let doc = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, tenant_id, filename, file_type, storage_path, content_hash,
                   extracted_text, processed, episode_ids, version, parent_id,
                   metadata, created_at_utc
            FROM documents
            WHERE tenant_id = $1 AND filename = $2
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(doc)
    }

    async fn find_by_hash(&self, tenant_id: &str, hash: &str) -> Result<Option<Document>> {
        let doc = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, tenant_id, filename, file_type, storage_path, content_hash,
                   extracted_text, processed, episode_ids, version, parent_id,
                   metadata, created_at_utc
            FROM documents
            WHERE tenant_id = $1 AND content_hash = $2
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(doc)
    }

    #[instrument(skip(self, doc), fields(subsystem = "db", component = "documents"))]
    async fn create_version(
        &self,
        doc: NewDocument,
        parent_id: Option<Uuid>,
        version: Option<i32>,
    ) -> Result<Document> {
        let version = version.unwrap_or(1);

        let created = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents
                (id, tenant_id, filename, file_type, storage_path, content_hash,
                 extracted_text, processed, episode_ids, version, parent_id,
                 metadata, created_at_utc)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, FALSE, '{}', $8, $9, $10, NOW())
            RETURNING id, tenant_id, filename, file_type, storage_path, content_hash,
                      extracted_text, processed, episode_ids, version, parent_id,
                      metadata, created_at_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&doc.tenant_id)
        .bind(&doc.filename)
        .bind(&doc.file_type)
        .bind(&doc.storage_path)
        .bind(&doc.content_hash)
        .bind(&doc.extracted_text)
        .bind(version)
        .bind(parent_id)
        .bind(&doc.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Error::DuplicateDocument(doc.content_hash.clone())
            }
            _ => Error::Database(e),
        })?;

        debug!(
            document_id = %created.id,
            tenant_id = %created.tenant_id,
            version = created.version,
            "Created document version"
        );

        Ok(created)
    }

    async fn fetch(&self, id: Uuid) -> Result<Document> {
        sqlx::query_as::<_, Document>(
            r#"
            SELECT id, tenant_id, filename, file_type, storage_path, content_hash,
                   extracted_text, processed, episode_ids, version, parent_id,
                   metadata, created_at_utc
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::DocumentNotFound(id))
    }

    async fn mark_processed(&self, id: Uuid, episode_ids: &[String]) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET processed = TRUE, episode_ids = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(episode_ids)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "text_search"))]
    async fn text_search(
        &self,
        tenant_id: &str,
        query: &str,
        limit: i64,
    ) -> Result<Vec<DocumentHit>> {
        let tsquery = websearch_query(query);
        if tsquery.is_empty() {
            return Ok(vec![]);
        }

        let rows: Vec<(Uuid, String, Option<String>, f32)> = sqlx::query_as(
            r#"
            SELECT id, filename,
                   LEFT(COALESCE(extracted_text, ''), $4),
                   ts_rank(to_tsvector('english', COALESCE(extracted_text, '')),
                           websearch_to_tsquery('english', $2)) AS rank
            FROM documents
            WHERE tenant_id = $1
              AND to_tsvector('english', COALESCE(extracted_text, ''))
                  @@ websearch_to_tsquery('english', $2)
            ORDER BY rank DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(&tsquery)
        .bind(limit)
        .bind(defaults::FALLBACK_SNIPPET_LEN as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|(document_id, filename, snippet, rank)| DocumentHit {
                document_id,
                filename,
                snippet: snippet.unwrap_or_default(),
                rank: rank as f64,
            })
            .collect())
    }

    async fn keyword_search(
        &self,
        tenant_id: &str,
        terms: &[String],
        limit: i64,
    ) -> Result<Vec<DocumentHit>> {
        if terms.is_empty() {
            return Ok(vec![]);
        }

        // Any-term match; rank by how many terms hit.
        let patterns: Vec<String> = terms
            .iter()
            .map(|t| format!("%{}%", escape_like(t)))
            .collect();

        let rows: Vec<(Uuid, String, Option<String>, i32)> = sqlx::query_as(
            r#"
            SELECT id, filename,
                   LEFT(COALESCE(extracted_text, ''), $4),
                   (SELECT COUNT(*)::int FROM unnest($2::text[]) AS p
                    WHERE COALESCE(extracted_text, '') ILIKE p) AS hits
            FROM documents
            WHERE tenant_id = $1
              AND EXISTS (SELECT 1 FROM unnest($2::text[]) AS p
                          WHERE COALESCE(extracted_text, '') ILIKE p)
            ORDER BY hits DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(&patterns)
        .bind(limit)
        .bind(defaults::FALLBACK_SNIPPET_LEN as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let max_hits = terms.len() as f64;
        Ok(rows
            .into_iter()
            .map(|(document_id, filename, snippet, hits)| DocumentHit {
                document_id,
                filename,
                snippet: snippet.unwrap_or_default(),
                rank: hits as f64 / max_hits,
            })
            .collect())
    }
}
