use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::core::keys::DocumentKey;

pub(crate) struct GetOrCreateSet<'a> {
    pub(crate) question_set_id: &'a str,
    pub(crate) key: &'a DocumentKey,
    pub(crate) staff_id: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Get-or-create the one question set for a key.
///
/// Serialized across all workers contending on the same key with a
/// transaction-scoped advisory lock, so the read-check-create sequence is a
/// critical section and concurrent creators converge on a single row. The
/// lock is released when the surrounding transaction ends. A null `staff_id`
/// on an existing row is backfilled when one is known; a set one is never
/// overwritten.
pub(crate) async fn get_or_create(
    conn: &mut PgConnection,
    params: GetOrCreateSet<'_>,
) -> Result<String, sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(params.key.lock_key())
        .execute(&mut *conn)
        .await?;

    let name = params.key.set_name();
    let existing: Option<(String, Option<String>)> = sqlx::query_as(
        "SELECT question_set_id, staff_id FROM viva_question_sets
         WHERE unit_code = $1 AND assessment_name = $2 AND name = $3
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(&params.key.unit_code)
    .bind(&params.key.assignment)
    .bind(&name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((question_set_id, existing_staff_id)) = existing {
        if existing_staff_id.is_none() {
            if let Some(staff_id) = params.staff_id {
                sqlx::query(
                    "UPDATE viva_question_sets SET staff_id = $1 WHERE question_set_id = $2",
                )
                .bind(staff_id)
                .bind(&question_set_id)
                .execute(&mut *conn)
                .await?;
            }
        }
        return Ok(question_set_id);
    }

    sqlx::query_scalar(
        "INSERT INTO viva_question_sets (
            question_set_id, name, unit_code, assessment_name, session_year, staff_id, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING question_set_id",
    )
    .bind(params.question_set_id)
    .bind(&name)
    .bind(&params.key.unit_code)
    .bind(&params.key.assignment)
    .bind(&params.key.session_year)
    .bind(params.staff_id)
    .bind(params.created_at)
    .fetch_one(&mut *conn)
    .await
}
