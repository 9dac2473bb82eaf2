use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::types::VivaSessionStatus;

pub(crate) struct EnsureSession<'a> {
    pub(crate) session_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) question_set_id: &'a str,
    pub(crate) remaining_attempts: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Insert-if-absent: at most one session links a student to a question set,
/// so replaying a generation job never duplicates sessions.
pub(crate) async fn ensure_exists(
    conn: &mut PgConnection,
    session: EnsureSession<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO viva_exam_sessions (
            session_id, student_id, question_set_id, status, remaining_attempts, created_at
        )
        SELECT $1, $2, $3, $4, $5, $6
        WHERE NOT EXISTS (
            SELECT 1 FROM viva_exam_sessions
            WHERE student_id = $2 AND question_set_id = $3
        )",
    )
    .bind(session.session_id)
    .bind(session.student_id)
    .bind(session.question_set_id)
    .bind(VivaSessionStatus::ReadyToStart)
    .bind(session.remaining_attempts)
    .bind(session.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
