use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Where a document lives in the store; mirrors the upload containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "documentkind", rename_all = "snake_case")]
pub(crate) enum DocumentKind {
    StudentSubmission,
    AssessmentBrief,
    AssessmentRubric,
    SeedQuestions,
}

impl DocumentKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::StudentSubmission => "student_submission",
            Self::AssessmentBrief => "assessment_brief",
            Self::AssessmentRubric => "assessment_rubric",
            Self::SeedQuestions => "seed_questions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "vivasessionstatus")]
pub(crate) enum VivaSessionStatus {
    #[serde(rename = "READY_TO_START")]
    #[sqlx(rename = "READY_TO_START")]
    ReadyToStart,
    #[serde(rename = "IN_PROGRESS")]
    #[sqlx(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    #[sqlx(rename = "COMPLETED")]
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "generationjobstatus", rename_all = "lowercase")]
pub(crate) enum GenerationJobStatus {
    Queued,
    Processing,
    Completed,
    Dropped,
    Failed,
}
