use anyhow::Result;
use tracing::debug;

use crate::core::keys::DocumentKey;
use crate::db::types::DocumentKind;
use crate::services::document_store::DocumentStore;

/// All three staff artifacts must exist before any generation job is worth
/// enqueuing. Pure read, safe to poll.
pub(crate) async fn staff_docs_ready(
    store: &dyn DocumentStore,
    key: &DocumentKey,
) -> Result<bool> {
    for kind in [
        DocumentKind::AssessmentBrief,
        DocumentKind::AssessmentRubric,
        DocumentKind::SeedQuestions,
    ] {
        if store.find_staff_document(kind, key).await?.is_none() {
            debug!(
                unit = %key.unit_code,
                assignment = %key.assignment,
                kind = ?kind,
                "staff document missing"
            );
            return Ok(false);
        }
    }

    Ok(true)
}
