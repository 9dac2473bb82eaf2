use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::keys::DocumentKey;
use crate::core::time::primitive_now_utc;
use crate::db::types::DocumentKind;
use crate::repositories;
use crate::services::document_store::DocumentStore;
use crate::services::readiness::staff_docs_ready;

/// One unit of generation work, as enqueued for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GenerationJob {
    pub(crate) student_id: String,
    pub(crate) unit_code: String,
    pub(crate) assignment: String,
    pub(crate) session_year: String,
    pub(crate) staff_id: Option<String>,
    pub(crate) alternate_questions: Vec<String>,
}

#[async_trait]
pub(crate) trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &GenerationJob) -> Result<()>;
}

#[derive(Clone)]
pub(crate) struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: &GenerationJob) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        repositories::generation_jobs::enqueue(
            &self.pool,
            repositories::generation_jobs::NewJob {
                id: &id,
                student_id: &job.student_id,
                unit_code: &job.unit_code,
                assignment: &job.assignment,
                session_year: &job.session_year,
                staff_id: job.staff_id.as_deref(),
                alternate_questions: &job.alternate_questions,
                created_at: primitive_now_utc(),
            },
        )
        .await
        .context("Failed to enqueue generation job")
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DispatchPolicy {
    pub(crate) ready_retries: u32,
    pub(crate) ready_delay: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DispatchReport {
    pub(crate) ready: bool,
    pub(crate) enqueued: usize,
    pub(crate) skipped_existing: usize,
}

/// Enqueue generation jobs for every student whose submission is waiting on
/// this assessment.
///
/// Polls the readiness gate up to `ready_retries` times before giving up;
/// a not-ready outcome is not an error, the next upload re-triggers
/// dispatch. Students who already have generated questions are skipped.
pub(crate) async fn dispatch(
    store: &dyn DocumentStore,
    queue: &dyn JobQueue,
    policy: DispatchPolicy,
    key: &DocumentKey,
) -> Result<DispatchReport> {
    let mut ready = false;
    for attempt in 1..=policy.ready_retries.max(1) {
        if staff_docs_ready(store, key).await? {
            ready = true;
            break;
        }
        if attempt < policy.ready_retries {
            tokio::time::sleep(policy.ready_delay).await;
        }
    }

    if !ready {
        warn!(
            unit = %key.unit_code,
            assignment = %key.assignment,
            session = %key.session_year,
            "staff documents not ready, skipping dispatch"
        );
        metrics::counter!("dispatch_not_ready_total").increment(1);
        return Ok(DispatchReport::default());
    }

    let student_ids = match &key.student_id {
        Some(student_id) => vec![student_id.clone()],
        None => store.list_submission_student_ids(&key.without_student()).await?,
    };

    let seed = store.find_staff_document(DocumentKind::SeedQuestions, key).await?;
    let (staff_id, alternate_questions) = match seed {
        Some(seed) => (seed.staff_id, seed.alternate_questions.0),
        None => (None, Vec::new()),
    };

    let mut report = DispatchReport { ready: true, ..DispatchReport::default() };
    for student_id in student_ids {
        let student_key = key.with_student(&student_id);
        if store.has_generated_questions(&student_key).await? {
            report.skipped_existing += 1;
            continue;
        }

        queue
            .enqueue(&GenerationJob {
                student_id: student_id.clone(),
                unit_code: key.unit_code.clone(),
                assignment: key.assignment.clone(),
                session_year: key.session_year.clone(),
                staff_id: staff_id.clone(),
                alternate_questions: alternate_questions.clone(),
            })
            .await?;
        report.enqueued += 1;
    }

    info!(
        unit = %key.unit_code,
        assignment = %key.assignment,
        enqueued = report.enqueued,
        skipped = report.skipped_existing,
        "dispatched generation jobs"
    );
    metrics::counter!("dispatch_jobs_enqueued_total").increment(report.enqueued as u64);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryDocumentStore, RecordingQueue};

    fn policy() -> DispatchPolicy {
        DispatchPolicy { ready_retries: 2, ready_delay: Duration::ZERO }
    }

    fn staff_key() -> DocumentKey {
        DocumentKey::new("comp1010", "assessment-1", "s2-2025")
    }

    fn seed_staff_docs(store: &InMemoryDocumentStore) {
        let key = staff_key();
        store.insert(DocumentKind::AssessmentBrief, &key, "brief");
        store.insert(DocumentKind::AssessmentRubric, &key, "rubric");
        store.insert_with_seed_meta(
            DocumentKind::SeedQuestions,
            &key,
            "1. seed",
            Some("staff-1"),
            &["alt one".to_string()],
        );
    }

    #[tokio::test]
    async fn not_ready_enqueues_nothing() {
        let store = InMemoryDocumentStore::new();
        let queue = RecordingQueue::new();
        store.insert(DocumentKind::AssessmentBrief, &staff_key(), "brief");

        let report = dispatch(&store, &queue, policy(), &staff_key()).await.unwrap();
        assert_eq!(report, DispatchReport::default());
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn enqueues_one_job_per_pending_student() {
        let store = InMemoryDocumentStore::new();
        let queue = RecordingQueue::new();
        seed_staff_docs(&store);
        let alice = staff_key().with_student("s100");
        let bob = staff_key().with_student("s200");
        store.insert(DocumentKind::StudentSubmission, &alice, "alice's work");
        store.insert(DocumentKind::StudentSubmission, &bob, "bob's work");
        store.mark_generated(&bob);

        let report = dispatch(&store, &queue, policy(), &staff_key()).await.unwrap();
        assert!(report.ready);
        assert_eq!(report.enqueued, 1);
        assert_eq!(report.skipped_existing, 1);

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].student_id, "s100");
        assert_eq!(jobs[0].staff_id.as_deref(), Some("staff-1"));
        assert_eq!(jobs[0].alternate_questions, vec!["alt one".to_string()]);
    }

    #[tokio::test]
    async fn second_dispatch_enqueues_zero_once_all_generated() {
        let store = InMemoryDocumentStore::new();
        let queue = RecordingQueue::new();
        seed_staff_docs(&store);
        let alice = staff_key().with_student("s100");
        store.insert(DocumentKind::StudentSubmission, &alice, "work");

        let first = dispatch(&store, &queue, policy(), &staff_key()).await.unwrap();
        assert_eq!(first.enqueued, 1);

        store.mark_generated(&alice);
        let second = dispatch(&store, &queue, policy(), &staff_key()).await.unwrap();
        assert_eq!(second.enqueued, 0);
        assert_eq!(second.skipped_existing, 1);
    }

    #[tokio::test]
    async fn student_scoped_key_dispatches_only_that_student() {
        let store = InMemoryDocumentStore::new();
        let queue = RecordingQueue::new();
        seed_staff_docs(&store);
        let alice = staff_key().with_student("s100");
        let bob = staff_key().with_student("s200");
        store.insert(DocumentKind::StudentSubmission, &alice, "work");
        store.insert(DocumentKind::StudentSubmission, &bob, "work");

        let report = dispatch(&store, &queue, policy(), &alice).await.unwrap();
        assert_eq!(report.enqueued, 1);
        assert_eq!(queue.jobs()[0].student_id, "s100");
    }

    #[tokio::test]
    async fn formatting_variant_key_hits_the_same_documents() {
        let store = InMemoryDocumentStore::new();
        let queue = RecordingQueue::new();
        seed_staff_docs(&store);
        let variant_key = DocumentKey::new("COMP1010", "Assessment 1", "S2_2025");
        let student = variant_key.with_student("S100");
        store.insert(DocumentKind::StudentSubmission, &student, "work");

        let report = dispatch(&store, &queue, policy(), &variant_key).await.unwrap();
        assert!(report.ready);
        assert_eq!(report.enqueued, 1);
    }
}
