use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::DocumentKind;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DocumentUpload {
    pub(crate) kind: DocumentKind,
    #[serde(alias = "unitCode")]
    #[validate(length(min = 1, message = "unit_code must not be empty"))]
    pub(crate) unit_code: String,
    #[validate(length(min = 1, message = "assignment must not be empty"))]
    pub(crate) assignment: String,
    #[serde(alias = "sessionYear")]
    #[validate(length(min = 1, message = "session_year must not be empty"))]
    pub(crate) session_year: String,
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "staffId")]
    pub(crate) staff_id: Option<String>,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) source: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentUploadResponse {
    pub(crate) id: String,
    pub(crate) dispatch: DispatchSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct DispatchSummary {
    pub(crate) ready: bool,
    pub(crate) enqueued: usize,
    pub(crate) skipped_existing: usize,
}
