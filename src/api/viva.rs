use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::keys::DocumentKey;
use crate::core::state::AppState;
use crate::db::types::DocumentKind;
use crate::schemas::viva::{
    VivaMessageRequest, VivaMessageResponse, VivaStartRequest, VivaStartResponse,
};
use crate::services::document_store::{DocumentStore, PgDocumentStore};
use crate::services::persistence::load_question_texts;
use crate::services::viva::TOTAL_QUESTIONS;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(start)).route("/message", post(message))
}

/// Open a dialogue over the student's persisted question set.
async fn start(
    State(state): State<AppState>,
    Json(payload): Json<VivaStartRequest>,
) -> Result<Json<VivaStartResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let key = DocumentKey::for_student(
        &payload.student_id,
        &payload.unit_code,
        &payload.assignment,
        &payload.session_year,
    );

    let questions = load_question_texts(state.db(), &key).await?;
    if questions.len() < TOTAL_QUESTIONS {
        return Err(ApiError::NotFound(format!(
            "no generated question set with {TOTAL_QUESTIONS} questions for this student"
        )));
    }

    let store = PgDocumentStore::new(state.db().clone());
    let submission = store
        .find_student_submission(&key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
        .ok_or_else(|| ApiError::NotFound("no submission found for this student".to_string()))?;

    // Ground the examiner in the submission plus the brief when available.
    let mut document_text = submission.content;
    if let Some(brief) = store
        .find_staff_document(DocumentKind::AssessmentBrief, &key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assessment brief"))?
    {
        document_text.push_str("\n\n");
        document_text.push_str(&brief.content);
    }

    let started = state.viva().start(document_text, questions).await?;
    Ok(Json(started.into()))
}

async fn message(
    State(state): State<AppState>,
    Json(payload): Json<VivaMessageRequest>,
) -> Result<Json<VivaMessageResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let turn = state
        .viva()
        .handle_message(state.ai(), &payload.session_id, &payload.user_message, payload.intent)
        .await?;

    Ok(Json(turn.into()))
}
