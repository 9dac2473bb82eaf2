use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::keys::{normalize_meta, DocumentKey};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::DocumentKind;
use crate::repositories;
use crate::schemas::seed::{SeedQuestionsUpload, SeedUploadResponse};
use crate::services::dispatch::{dispatch, PgJobQueue};
use crate::services::document_store::PgDocumentStore;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(upload))
}

async fn upload(
    State(state): State<AppState>,
    Json(payload): Json<SeedQuestionsUpload>,
) -> Result<Json<SeedUploadResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let cleaned = payload.cleaned();
    if cleaned.questions.is_empty() {
        return Err(ApiError::BadRequest("seed_questions cannot be empty".to_string()));
    }

    let key = DocumentKey::new(&payload.unit_code, &payload.assignment, &payload.session_year);
    let staff_id =
        payload.staff_id.as_deref().map(normalize_meta).filter(|staff_id| !staff_id.is_empty());
    let content = SeedQuestionsUpload::render_content(&cleaned.questions);

    repositories::documents::upsert(
        state.db(),
        repositories::documents::UpsertDocument {
            kind: DocumentKind::SeedQuestions,
            key: &key,
            staff_id: staff_id.as_deref(),
            content: &content,
            source: "seed-questions-upload",
            alternate_questions: &cleaned.alternates,
            uploaded_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store seed questions"))?;

    // Seed upload may be the artifact that completes readiness.
    let store = PgDocumentStore::new(state.db().clone());
    let queue = PgJobQueue::new(state.db().clone());
    dispatch(&store, &queue, state.dispatch_policy(), &key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to dispatch generation jobs"))?;

    Ok(Json(SeedUploadResponse { status: "ok", stored_questions: cleaned.questions.len() }))
}
