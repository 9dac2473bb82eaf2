use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::core::error::PipelineError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::GenerationJobRow;
use crate::repositories;
use crate::services::document_store::{DocumentStore, PgDocumentStore};
use crate::services::generation::{resolve_generation_inputs, QuestionGenerator};
use crate::services::persistence::{store_generated_questions, GeneratedQuestionSet};

pub(crate) async fn claim_next_job(pool: &PgPool) -> Result<Option<GenerationJobRow>> {
    repositories::generation_jobs::claim_next(pool, primitive_now_utc())
        .await
        .context("Failed to claim generation job")
}

/// Run one claimed job end to end.
///
/// Idempotent under redelivery: the dedup re-check exits early when another
/// delivery of the same job already wrote the questions.
pub(crate) async fn process_job(
    state: &AppState,
    job: &GenerationJobRow,
) -> Result<(), PipelineError> {
    let key = job_key(job);
    let store = PgDocumentStore::new(state.db().clone());

    if store.has_generated_questions(&key).await? {
        info!(job_id = %job.id, student_id = %job.student_id, "questions already generated, skipping");
        return Ok(());
    }

    let inputs = resolve_generation_inputs(&store, &key).await?;
    let generated = state.ai().generate(&inputs).await.map_err(PipelineError::Fatal)?;

    store_generated_questions(
        state.db(),
        &GeneratedQuestionSet {
            key,
            staff_id: job.staff_id.clone(),
            questions: generated.questions,
            references: generated.references,
            alternate_questions: job.alternate_questions.0.clone(),
        },
    )
    .await?;

    Ok(())
}

/// Queue-side policy for a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobDisposition {
    Completed,
    Dropped,
    Retry,
}

/// Missing prerequisites cannot be fixed by retrying the same job; the next
/// upload re-dispatches. Everything else goes back on the queue.
pub(crate) fn disposition(outcome: &Result<(), PipelineError>) -> JobDisposition {
    match outcome {
        Ok(()) => JobDisposition::Completed,
        Err(PipelineError::MissingPrerequisites(_)) => JobDisposition::Dropped,
        Err(_) => JobDisposition::Retry,
    }
}

pub(crate) async fn finish_job(
    state: &AppState,
    job: &GenerationJobRow,
    outcome: Result<(), PipelineError>,
) -> Result<()> {
    let now = primitive_now_utc();
    match disposition(&outcome) {
        JobDisposition::Completed => {
            metrics::counter!("generation_jobs_total", "status" => "completed").increment(1);
            repositories::generation_jobs::mark_completed(state.db(), &job.id, now)
                .await
                .context("Failed to mark job completed")
        }
        JobDisposition::Dropped => {
            let reason = outcome.unwrap_err().to_string();
            info!(job_id = %job.id, reason = %reason, "dropping generation job");
            metrics::counter!("generation_jobs_total", "status" => "dropped").increment(1);
            repositories::generation_jobs::mark_dropped(state.db(), &job.id, &reason, now)
                .await
                .context("Failed to mark job dropped")
        }
        JobDisposition::Retry => {
            let error = outcome.unwrap_err().to_string();
            tracing::error!(job_id = %job.id, error = %error, "generation job failed");
            metrics::counter!("generation_jobs_total", "status" => "failed").increment(1);
            let worker = state.settings().worker();
            repositories::generation_jobs::release_for_retry(
                state.db(),
                &job.id,
                job.attempts,
                worker.max_job_attempts as i32,
                worker.retry_delay_seconds,
                &error,
                now,
            )
            .await
            .context("Failed to release job for retry")
        }
    }
}

fn job_key(job: &GenerationJobRow) -> crate::core::keys::DocumentKey {
    crate::core::keys::DocumentKey::for_student(
        &job.student_id,
        &job.unit_code,
        &job.assignment,
        &job.session_year,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_jobs_are_acked() {
        assert_eq!(disposition(&Ok(())), JobDisposition::Completed);
    }

    #[test]
    fn missing_prerequisites_drop_the_job() {
        let outcome = Err(PipelineError::missing("no rubric"));
        assert_eq!(disposition(&outcome), JobDisposition::Dropped);
    }

    #[test]
    fn other_failures_are_redelivered() {
        let outcome = Err(PipelineError::Fatal(anyhow::anyhow!("model timeout")));
        assert_eq!(disposition(&outcome), JobDisposition::Retry);
        let outcome = Err(PipelineError::invalid("bad payload"));
        assert_eq!(disposition(&outcome), JobDisposition::Retry);
    }
}
