use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GenerateQuestionsRequest {
    #[serde(alias = "studentId")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
    #[serde(alias = "unitCode")]
    #[validate(length(min = 1, message = "unit_code must not be empty"))]
    pub(crate) unit_code: String,
    #[serde(alias = "sessionYear")]
    #[validate(length(min = 1, message = "session_year must not be empty"))]
    pub(crate) session_year: String,
    #[validate(length(min = 1, message = "assignment must not be empty"))]
    pub(crate) assignment: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeneratedQuestionsResponse {
    pub(crate) student_id: String,
    pub(crate) questions: Vec<String>,
    pub(crate) reference: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegenerateQuestionRequest {
    #[serde(alias = "currentQuestion")]
    #[validate(length(min = 1, message = "current_question must not be empty"))]
    pub(crate) current_question: String,
    #[serde(alias = "userComment")]
    #[validate(length(min = 1, message = "user_comment must not be empty"))]
    pub(crate) user_comment: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegeneratedQuestionResponse {
    pub(crate) regenerated_question: String,
}
