use sqlx::PgPool;
use time::{Duration, PrimitiveDateTime};

use crate::db::models::GenerationJobRow;
use crate::db::types::GenerationJobStatus;

pub(crate) const COLUMNS: &str = "\
    id, student_id, unit_code, assignment, session_year, staff_id, \
    alternate_questions, status, attempts, last_error, available_at, created_at, updated_at";

pub(crate) struct NewJob<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) unit_code: &'a str,
    pub(crate) assignment: &'a str,
    pub(crate) session_year: &'a str,
    pub(crate) staff_id: Option<&'a str>,
    pub(crate) alternate_questions: &'a [String],
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn enqueue(pool: &PgPool, job: NewJob<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO generation_jobs (
            id, student_id, unit_code, assignment, session_year, staff_id,
            alternate_questions, status, available_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9,$9)",
    )
    .bind(job.id)
    .bind(job.student_id)
    .bind(job.unit_code)
    .bind(job.assignment)
    .bind(job.session_year)
    .bind(job.staff_id)
    .bind(sqlx::types::Json(job.alternate_questions))
    .bind(GenerationJobStatus::Queued)
    .bind(job.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Claim the oldest due job; `FOR UPDATE SKIP LOCKED` keeps concurrent
/// workers off each other's claims.
pub(crate) async fn claim_next(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Option<GenerationJobRow>, sqlx::Error> {
    sqlx::query_as::<_, GenerationJobRow>(&format!(
        "WITH candidate AS (
            SELECT id AS claim_id
            FROM generation_jobs
            WHERE status = $1 AND available_at <= $2
            ORDER BY created_at
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        UPDATE generation_jobs
        SET status = $3, attempts = attempts + 1, updated_at = $2
        FROM candidate
        WHERE generation_jobs.id = candidate.claim_id
        RETURNING {COLUMNS}"
    ))
    .bind(GenerationJobStatus::Queued)
    .bind(now)
    .bind(GenerationJobStatus::Processing)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_completed(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE generation_jobs SET status = $1, last_error = NULL, updated_at = $2 WHERE id = $3")
        .bind(GenerationJobStatus::Completed)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn mark_dropped(
    pool: &PgPool,
    id: &str,
    reason: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE generation_jobs SET status = $1, last_error = $2, updated_at = $3 WHERE id = $4")
        .bind(GenerationJobStatus::Dropped)
        .bind(reason)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Put a failed job back on the queue with a delay, or park it as failed
/// once the attempt budget is spent.
pub(crate) async fn release_for_retry(
    pool: &PgPool,
    id: &str,
    attempts: i32,
    max_attempts: i32,
    retry_delay_seconds: u64,
    error: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let status = if attempts >= max_attempts {
        GenerationJobStatus::Failed
    } else {
        GenerationJobStatus::Queued
    };
    let available_at = now + Duration::seconds(retry_delay_seconds as i64);

    sqlx::query(
        "UPDATE generation_jobs
         SET status = $1, last_error = $2, available_at = $3, updated_at = $4
         WHERE id = $5",
    )
    .bind(status)
    .bind(error)
    .bind(available_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}
