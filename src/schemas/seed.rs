use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SeedItem {
    #[serde(default)]
    pub(crate) question: Option<String>,
    #[serde(default)]
    #[serde(alias = "alternateQuestion")]
    pub(crate) alternate_question: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SeedQuestionsUpload {
    #[serde(alias = "unitCode")]
    #[validate(length(min = 1, message = "unit_code must not be empty"))]
    pub(crate) unit_code: String,
    #[validate(length(min = 1, message = "assignment must not be empty"))]
    pub(crate) assignment: String,
    #[serde(alias = "sessionYear")]
    #[validate(length(min = 1, message = "session_year must not be empty"))]
    pub(crate) session_year: String,
    #[serde(default)]
    #[serde(alias = "staffId")]
    pub(crate) staff_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "seedQuestions")]
    pub(crate) seed_questions: Vec<String>,
    #[serde(default)]
    #[serde(alias = "alternateQuestions")]
    pub(crate) alternate_questions: Vec<String>,
    #[serde(default)]
    #[serde(alias = "seedItems")]
    pub(crate) seed_items: Vec<SeedItem>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct CleanedSeed {
    pub(crate) questions: Vec<String>,
    pub(crate) alternates: Vec<String>,
}

impl SeedQuestionsUpload {
    /// Structured seed items win over the flat lists; blanks are dropped
    /// everywhere.
    pub(crate) fn cleaned(&self) -> CleanedSeed {
        if !self.seed_items.is_empty() {
            let mut questions = Vec::new();
            let mut alternates = Vec::new();
            for item in &self.seed_items {
                if let Some(primary) = trimmed(item.question.as_deref()) {
                    questions.push(primary);
                }
                if let Some(alt) = trimmed(item.alternate_question.as_deref()) {
                    alternates.push(alt);
                }
            }
            return CleanedSeed { questions, alternates };
        }

        CleanedSeed {
            questions: self
                .seed_questions
                .iter()
                .filter_map(|q| trimmed(Some(q)))
                .collect(),
            alternates: self
                .alternate_questions
                .iter()
                .filter_map(|q| trimmed(Some(q)))
                .collect(),
        }
    }

    /// Numbered one-per-line rendering stored as the document body.
    pub(crate) fn render_content(questions: &[String]) -> String {
        questions
            .iter()
            .enumerate()
            .map(|(idx, question)| format!("{}. {question}", idx + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SeedUploadResponse {
    pub(crate) status: &'static str,
    pub(crate) stored_questions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_upload() -> SeedQuestionsUpload {
        SeedQuestionsUpload {
            unit_code: "comp1010".into(),
            assignment: "assessment-1".into(),
            session_year: "s2-2025".into(),
            staff_id: None,
            seed_questions: Vec::new(),
            alternate_questions: Vec::new(),
            seed_items: Vec::new(),
        }
    }

    #[test]
    fn flat_lists_are_trimmed_and_filtered() {
        let mut upload = base_upload();
        upload.seed_questions = vec!["  Why?  ".into(), "".into(), " How? ".into()];
        upload.alternate_questions = vec![" Alt ".into(), "   ".into()];

        let cleaned = upload.cleaned();
        assert_eq!(cleaned.questions, vec!["Why?", "How?"]);
        assert_eq!(cleaned.alternates, vec!["Alt"]);
    }

    #[test]
    fn seed_items_take_precedence() {
        let mut upload = base_upload();
        upload.seed_questions = vec!["ignored".into()];
        upload.seed_items = vec![
            SeedItem { question: Some("From item".into()), alternate_question: Some(" alt ".into()) },
            SeedItem { question: Some("  ".into()), alternate_question: None },
        ];

        let cleaned = upload.cleaned();
        assert_eq!(cleaned.questions, vec!["From item"]);
        assert_eq!(cleaned.alternates, vec!["alt"]);
    }

    #[test]
    fn content_is_numbered_lines() {
        let questions = vec!["First".to_string(), "Second".to_string()];
        assert_eq!(SeedQuestionsUpload::render_content(&questions), "1. First\n2. Second");
    }
}
