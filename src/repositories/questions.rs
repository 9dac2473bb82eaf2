use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::core::keys::DocumentKey;
use crate::db::models::QuestionRow;

pub(crate) struct NewQuestion {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) reference_text: Option<String>,
    pub(crate) alternate_question: Option<String>,
}

/// Atomically swap the row set for `(question_set_id, student_id)`.
///
/// Must run inside the same transaction as the set lookup; replaying the
/// same rows leaves the table in the same final state.
pub(crate) async fn replace_for_student(
    conn: &mut PgConnection,
    question_set_id: &str,
    student_id: Option<&str>,
    rows: &[NewQuestion],
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    match student_id {
        Some(student_id) => {
            sqlx::query(
                "DELETE FROM viva_questions WHERE question_set_id = $1 AND student_id = $2",
            )
            .bind(question_set_id)
            .bind(student_id)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                "DELETE FROM viva_questions WHERE question_set_id = $1 AND student_id IS NULL",
            )
            .bind(question_set_id)
            .execute(&mut *conn)
            .await?;
        }
    }

    if rows.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO viva_questions (
            question_id, question_set_id, student_id, question_text,
            reference_text, alternate_question, created_at) ",
    );
    builder.push_values(rows, |mut values, row| {
        values
            .push_bind(&row.question_id)
            .push_bind(question_set_id)
            .push_bind(student_id)
            .push_bind(&row.question_text)
            .push_bind(&row.reference_text)
            .push_bind(&row.alternate_question)
            .push_bind(created_at);
    });
    builder.build().execute(&mut *conn).await?;

    Ok(())
}

/// Dedup check: does this student already have generated questions for the
/// key's question set?
pub(crate) async fn exist_for_key(pool: &PgPool, key: &DocumentKey) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1
            FROM viva_questions q
            JOIN viva_question_sets s ON s.question_set_id = q.question_set_id
            WHERE s.unit_code = $1 AND s.assessment_name = $2 AND s.name = $3
              AND q.student_id IS NOT DISTINCT FROM $4
        )",
    )
    .bind(&key.unit_code)
    .bind(&key.assignment)
    .bind(key.set_name())
    .bind(key.student_id.as_deref())
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_key(
    pool: &PgPool,
    key: &DocumentKey,
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT q.question_id, q.question_set_id, q.student_id, q.question_text,
                q.reference_text, q.alternate_question, q.created_at
         FROM viva_questions q
         JOIN viva_question_sets s ON s.question_set_id = q.question_set_id
         WHERE s.unit_code = $1 AND s.assessment_name = $2 AND s.name = $3
           AND q.student_id IS NOT DISTINCT FROM $4
         ORDER BY q.created_at, q.question_id",
    )
    .bind(&key.unit_code)
    .bind(&key.assignment)
    .bind(key.set_name())
    .bind(key.student_id.as_deref())
    .fetch_all(pool)
    .await
}
