use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::keys::{normalize_label, DocumentKey};
use crate::db::models::Document;
use crate::db::types::DocumentKind;
use crate::repositories;

/// Read surface the readiness gate and the dispatcher depend on.
///
/// Backed by Postgres in production; tests substitute an in-memory map.
#[async_trait]
pub(crate) trait DocumentStore: Send + Sync {
    async fn find_staff_document(
        &self,
        kind: DocumentKind,
        key: &DocumentKey,
    ) -> Result<Option<Document>>;

    async fn find_student_submission(&self, key: &DocumentKey) -> Result<Option<Document>>;

    async fn list_submission_student_ids(&self, key: &DocumentKey) -> Result<Vec<String>>;

    async fn has_generated_questions(&self, key: &DocumentKey) -> Result<bool>;
}

#[derive(Clone)]
pub(crate) struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_staff_document(
        &self,
        kind: DocumentKind,
        key: &DocumentKey,
    ) -> Result<Option<Document>> {
        let key = key.without_student();
        if let Some(document) = repositories::documents::find_by_key(&self.pool, kind, &key)
            .await
            .context("Failed to fetch staff document")?
        {
            return Ok(Some(document));
        }

        // Exact canonical miss: fall back to comparing canonical assignment
        // labels, so rows stored before normalization still match.
        let candidates = repositories::documents::list_by_unit_session(
            &self.pool,
            kind,
            &key.unit_code,
            &key.session_year,
        )
        .await
        .context("Failed to list staff documents")?;

        Ok(candidates
            .into_iter()
            .find(|document| normalize_label(&document.assignment) == key.assignment))
    }

    async fn find_student_submission(&self, key: &DocumentKey) -> Result<Option<Document>> {
        repositories::documents::find_by_key(&self.pool, DocumentKind::StudentSubmission, key)
            .await
            .context("Failed to fetch student submission")
    }

    async fn list_submission_student_ids(&self, key: &DocumentKey) -> Result<Vec<String>> {
        repositories::documents::list_submission_student_ids(&self.pool, key)
            .await
            .context("Failed to list submission students")
    }

    async fn has_generated_questions(&self, key: &DocumentKey) -> Result<bool> {
        repositories::questions::exist_for_key(&self.pool, key)
            .await
            .context("Failed to check generated questions")
    }
}
