use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::viva::{MessageIntent, StartedViva, VivaTurn};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct VivaStartRequest {
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
pub(crate) struct VivaStartResponse {
    pub(crate) session_id: String,
    pub(crate) question: String,
    pub(crate) question_number: usize,
    pub(crate) total_questions: usize,
}

impl From<StartedViva> for VivaStartResponse {
    fn from(started: StartedViva) -> Self {
        Self {
            session_id: started.session_id,
            question: started.question,
            question_number: started.question_number,
            total_questions: started.total_questions,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct VivaMessageRequest {
    #[serde(alias = "sessionId")]
    #[validate(length(min = 1, message = "session_id must not be empty"))]
    pub(crate) session_id: String,
    #[serde(alias = "userMessage")]
    #[validate(length(min = 1, message = "user_message must not be empty"))]
    pub(crate) user_message: String,
    #[serde(default)]
    pub(crate) intent: MessageIntent,
}

#[derive(Debug, Serialize)]
pub(crate) struct VivaMessageResponse {
    pub(crate) done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) question_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) score: Option<i32>,
    pub(crate) total_questions: usize,
}

impl From<VivaTurn> for VivaMessageResponse {
    fn from(turn: VivaTurn) -> Self {
        match turn {
            VivaTurn::NextQuestion { question, question_number, total_questions } => Self {
                done: false,
                message: None,
                question: Some(question),
                question_number: Some(question_number),
                feedback: None,
                score: None,
                total_questions,
            },
            VivaTurn::Clarification { message, question, question_number, total_questions } => {
                Self {
                    done: false,
                    message: Some(message),
                    question: Some(question),
                    question_number: Some(question_number),
                    feedback: None,
                    score: None,
                    total_questions,
                }
            }
            VivaTurn::Completed { feedback, score, total_questions } => Self {
                done: true,
                message: None,
                question: None,
                question_number: None,
                feedback,
                score,
                total_questions,
            },
        }
    }
}
