use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DocumentKind, GenerationJobStatus};

/// One uploaded artifact; exactly one live row per normalized identity key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Document {
    pub(crate) id: String,
    pub(crate) kind: DocumentKind,
    pub(crate) unit_code: String,
    pub(crate) assignment: String,
    pub(crate) session_year: String,
    pub(crate) student_id: Option<String>,
    pub(crate) staff_id: Option<String>,
    pub(crate) content: String,
    pub(crate) source: String,
    pub(crate) alternate_questions: Json<Vec<String>>,
    pub(crate) uploaded_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) question_id: String,
    pub(crate) question_set_id: String,
    pub(crate) student_id: Option<String>,
    pub(crate) question_text: String,
    pub(crate) reference_text: Option<String>,
    pub(crate) alternate_question: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// One queued generation job; the durable work queue for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GenerationJobRow {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) unit_code: String,
    pub(crate) assignment: String,
    pub(crate) session_year: String,
    pub(crate) staff_id: Option<String>,
    pub(crate) alternate_questions: Json<Vec<String>>,
    pub(crate) status: GenerationJobStatus,
    pub(crate) attempts: i32,
    pub(crate) last_error: Option<String>,
    pub(crate) available_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
