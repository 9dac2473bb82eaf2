use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::keys::DocumentKey;
use crate::core::state::AppState;
use crate::schemas::questions::{
    GenerateQuestionsRequest, GeneratedQuestionsResponse, RegenerateQuestionRequest,
    RegeneratedQuestionResponse,
};
use crate::services::document_store::PgDocumentStore;
use crate::services::generation::{resolve_generation_inputs, QuestionGenerator};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate)).route("/regenerate", post(regenerate))
}

/// Synchronous one-off generation for staff preview; results are returned
/// but not persisted, the queued pipeline owns the durable write path.
async fn generate(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<Json<GeneratedQuestionsResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let key = DocumentKey::for_student(
        &payload.student_id,
        &payload.unit_code,
        &payload.assignment,
        &payload.session_year,
    );
    let store = PgDocumentStore::new(state.db().clone());
    let inputs = resolve_generation_inputs(&store, &key).await?;
    let generated = state
        .ai()
        .generate(&inputs)
        .await
        .map_err(|e| ApiError::internal(e, "Question generation failed"))?;

    Ok(Json(GeneratedQuestionsResponse {
        student_id: inputs.student_id,
        questions: generated.questions,
        reference: generated.references,
    }))
}

async fn regenerate(
    State(state): State<AppState>,
    Json(payload): Json<RegenerateQuestionRequest>,
) -> Result<Json<RegeneratedQuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let regenerated_question = state
        .ai()
        .regenerate(&payload.current_question, &payload.user_comment)
        .await
        .map_err(|e| ApiError::internal(e, "Question regeneration failed"))?;

    Ok(Json(RegeneratedQuestionResponse { regenerated_question }))
}
