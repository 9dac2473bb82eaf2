use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::keys::{normalize_meta, DocumentKey};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::DocumentKind;
use crate::repositories;
use crate::schemas::documents::{DispatchSummary, DocumentUpload, DocumentUploadResponse};
use crate::services::dispatch::{dispatch, PgJobQueue};
use crate::services::document_store::PgDocumentStore;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(upload))
}

/// Store one document and trigger dispatch for its key.
///
/// A submission dispatches for that student only; a staff upload dispatches
/// for every student already waiting on the assessment.
async fn upload(
    State(state): State<AppState>,
    Json(payload): Json<DocumentUpload>,
) -> Result<Json<DocumentUploadResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student_id = payload.student_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    let is_submission = payload.kind == DocumentKind::StudentSubmission;
    if is_submission && student_id.is_none() {
        return Err(ApiError::BadRequest(
            "student_id is required for student submissions".to_string(),
        ));
    }
    if !is_submission && student_id.is_some() {
        return Err(ApiError::BadRequest(
            "student_id is only valid for student submissions".to_string(),
        ));
    }

    let mut key = DocumentKey::new(&payload.unit_code, &payload.assignment, &payload.session_year);
    if let Some(student_id) = student_id {
        key = key.with_student(student_id);
    }
    let staff_id =
        payload.staff_id.as_deref().map(normalize_meta).filter(|staff_id| !staff_id.is_empty());

    repositories::documents::upsert(
        state.db(),
        repositories::documents::UpsertDocument {
            kind: payload.kind,
            key: &key,
            staff_id: staff_id.as_deref(),
            content: &payload.content,
            source: payload.source.as_deref().unwrap_or("api-upload"),
            alternate_questions: &[],
            uploaded_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store document"))?;

    let store = PgDocumentStore::new(state.db().clone());
    let queue = PgJobQueue::new(state.db().clone());
    let report = dispatch(&store, &queue, state.dispatch_policy(), &key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to dispatch generation jobs"))?;

    Ok(Json(DocumentUploadResponse {
        id: repositories::documents::document_id(payload.kind, &key),
        dispatch: DispatchSummary {
            ready: report.ready,
            enqueued: report.enqueued,
            skipped_existing: report.skipped_existing,
        },
    }))
}
