use async_trait::async_trait;
use tracing::debug;

use crate::core::error::PipelineError;
use crate::core::keys::DocumentKey;
use crate::db::types::DocumentKind;
use crate::services::document_store::DocumentStore;

/// Everything the model needs to write questions for one student.
#[derive(Debug, Clone)]
pub(crate) struct GenerationInputs {
    pub(crate) student_id: String,
    pub(crate) submission_text: String,
    pub(crate) brief_text: String,
    pub(crate) rubric_text: String,
    pub(crate) seed_questions_text: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GeneratedQuestions {
    pub(crate) questions: Vec<String>,
    pub(crate) references: Vec<String>,
}

#[async_trait]
pub(crate) trait QuestionGenerator: Send + Sync {
    async fn generate(&self, inputs: &GenerationInputs) -> anyhow::Result<GeneratedQuestions>;

    async fn regenerate(&self, current_question: &str, comment: &str) -> anyhow::Result<String>;
}

/// Gather the documents a generation job depends on.
///
/// A missing submission, brief or rubric is a prerequisite failure, not a
/// transient fault: retrying the job cannot make the document appear, so
/// the caller drops it.
pub(crate) async fn resolve_generation_inputs(
    store: &dyn DocumentStore,
    key: &DocumentKey,
) -> Result<GenerationInputs, PipelineError> {
    let student_id = key
        .student_id
        .clone()
        .ok_or_else(|| PipelineError::invalid("generation requires a student key"))?;

    let submission = store
        .find_student_submission(key)
        .await?
        .ok_or_else(|| PipelineError::missing(format!("submission for student {student_id}")))?;

    let brief = store
        .find_staff_document(DocumentKind::AssessmentBrief, key)
        .await?
        .ok_or_else(|| PipelineError::missing(format!("assessment brief for {}", key.set_name())))?;

    let rubric = store
        .find_staff_document(DocumentKind::AssessmentRubric, key)
        .await?
        .ok_or_else(|| PipelineError::missing(format!("assessment rubric for {}", key.set_name())))?;

    let seed = store.find_staff_document(DocumentKind::SeedQuestions, key).await?;
    if seed.is_none() {
        debug!(set = %key.set_name(), "no seed questions, generating without them");
    }

    Ok(GenerationInputs {
        student_id,
        submission_text: submission.content,
        brief_text: brief.content,
        rubric_text: rubric.content,
        seed_questions_text: seed.map(|doc| doc.content),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::DocumentKey;
    use crate::test_support::InMemoryDocumentStore;

    fn student_key() -> DocumentKey {
        DocumentKey::for_student("s100", "comp1010", "assessment-1", "s2-2025")
    }

    #[tokio::test]
    async fn missing_submission_is_a_prerequisite_failure() {
        let store = InMemoryDocumentStore::new();
        let key = student_key();
        let staff = key.without_student();
        store.insert(DocumentKind::AssessmentBrief, &staff, "brief");
        store.insert(DocumentKind::AssessmentRubric, &staff, "rubric");

        let err = resolve_generation_inputs(&store, &key).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingPrerequisites(_)));
    }

    #[tokio::test]
    async fn missing_rubric_is_a_prerequisite_failure() {
        let store = InMemoryDocumentStore::new();
        let key = student_key();
        store.insert(DocumentKind::StudentSubmission, &key, "work");
        store.insert(DocumentKind::AssessmentBrief, &key.without_student(), "brief");

        let err = resolve_generation_inputs(&store, &key).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingPrerequisites(_)));
    }

    #[tokio::test]
    async fn gathers_all_texts_when_present() {
        let store = InMemoryDocumentStore::new();
        let key = student_key();
        let staff = key.without_student();
        store.insert(DocumentKind::StudentSubmission, &key, "work");
        store.insert(DocumentKind::AssessmentBrief, &staff, "brief");
        store.insert(DocumentKind::AssessmentRubric, &staff, "rubric");
        store.insert(DocumentKind::SeedQuestions, &staff, "1. seed");

        let inputs = resolve_generation_inputs(&store, &key).await.unwrap();
        assert_eq!(inputs.student_id, "s100");
        assert_eq!(inputs.submission_text, "work");
        assert_eq!(inputs.brief_text, "brief");
        assert_eq!(inputs.rubric_text, "rubric");
        assert_eq!(inputs.seed_questions_text.as_deref(), Some("1. seed"));
    }

    #[tokio::test]
    async fn seed_questions_are_optional_for_generation() {
        let store = InMemoryDocumentStore::new();
        let key = student_key();
        let staff = key.without_student();
        store.insert(DocumentKind::StudentSubmission, &key, "work");
        store.insert(DocumentKind::AssessmentBrief, &staff, "brief");
        store.insert(DocumentKind::AssessmentRubric, &staff, "rubric");

        let inputs = resolve_generation_inputs(&store, &key).await.unwrap();
        assert_eq!(inputs.seed_questions_text, None);
    }
}
