use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::keys::DocumentKey;
use crate::db::models::Document;
use crate::db::types::DocumentKind;

pub(crate) const COLUMNS: &str = "\
    id, kind, unit_code, assignment, session_year, student_id, staff_id, \
    content, source, alternate_questions, uploaded_at";

/// Row id for a document: the kind joined with the canonical composite key.
/// Each kind gets its own identity, so a brief and a rubric for the same
/// assessment never overwrite each other.
pub(crate) fn document_id(kind: DocumentKind, key: &DocumentKey) -> String {
    format!("{}_{}", kind.as_str(), key.storage_id())
}

pub(crate) struct UpsertDocument<'a> {
    pub(crate) kind: DocumentKind,
    pub(crate) key: &'a DocumentKey,
    pub(crate) staff_id: Option<&'a str>,
    pub(crate) content: &'a str,
    pub(crate) source: &'a str,
    pub(crate) alternate_questions: &'a [String],
    pub(crate) uploaded_at: PrimitiveDateTime,
}

/// Replace-on-conflict upsert: one live row per identity key.
pub(crate) async fn upsert(
    pool: &PgPool,
    document: UpsertDocument<'_>,
) -> Result<(), sqlx::Error> {
    let id = document_id(document.kind, document.key);
    sqlx::query(
        "INSERT INTO documents (
            id, kind, unit_code, assignment, session_year, student_id, staff_id,
            content, source, alternate_questions, uploaded_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        ON CONFLICT (id) DO UPDATE SET
            kind = EXCLUDED.kind,
            unit_code = EXCLUDED.unit_code,
            assignment = EXCLUDED.assignment,
            session_year = EXCLUDED.session_year,
            student_id = EXCLUDED.student_id,
            staff_id = EXCLUDED.staff_id,
            content = EXCLUDED.content,
            source = EXCLUDED.source,
            alternate_questions = EXCLUDED.alternate_questions,
            uploaded_at = EXCLUDED.uploaded_at",
    )
    .bind(&id)
    .bind(document.kind)
    .bind(&document.key.unit_code)
    .bind(&document.key.assignment)
    .bind(&document.key.session_year)
    .bind(document.key.student_id.as_deref())
    .bind(document.staff_id)
    .bind(document.content)
    .bind(document.source)
    .bind(sqlx::types::Json(document.alternate_questions))
    .bind(document.uploaded_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn find_by_key(
    pool: &PgPool,
    kind: DocumentKind,
    key: &DocumentKey,
) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "SELECT {COLUMNS} FROM documents
         WHERE kind = $1 AND unit_code = $2 AND session_year = $3 AND assignment = $4
           AND student_id IS NOT DISTINCT FROM $5"
    ))
    .bind(kind)
    .bind(&key.unit_code)
    .bind(&key.session_year)
    .bind(&key.assignment)
    .bind(key.student_id.as_deref())
    .fetch_optional(pool)
    .await
}

/// All staff rows for a unit/session regardless of how the assignment label
/// was spelled at upload time; the caller compares canonical labels.
pub(crate) async fn list_by_unit_session(
    pool: &PgPool,
    kind: DocumentKind,
    unit_code: &str,
    session_year: &str,
) -> Result<Vec<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "SELECT {COLUMNS} FROM documents
         WHERE kind = $1 AND unit_code = $2 AND session_year = $3 AND student_id IS NULL"
    ))
    .bind(kind)
    .bind(unit_code)
    .bind(session_year)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_submission_student_ids(
    pool: &PgPool,
    key: &DocumentKey,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT student_id FROM documents
         WHERE kind = $1 AND unit_code = $2 AND session_year = $3 AND assignment = $4
           AND student_id IS NOT NULL
         ORDER BY student_id",
    )
    .bind(DocumentKind::StudentSubmission)
    .bind(&key.unit_code)
    .bind(&key.session_year)
    .bind(&key.assignment)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_gets_its_own_row_id() {
        let key = DocumentKey::new("comp1010", "assessment-1", "s2-2025");
        let ids = [
            document_id(DocumentKind::AssessmentBrief, &key),
            document_id(DocumentKind::AssessmentRubric, &key),
            document_id(DocumentKind::SeedQuestions, &key),
        ];

        assert_eq!(ids[0], "assessment_brief_comp1010_assessment-1_s2-2025");
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn submission_ids_are_student_scoped() {
        let key = DocumentKey::for_student("s100", "comp1010", "assessment-1", "s2-2025");
        assert_eq!(
            document_id(DocumentKind::StudentSubmission, &key),
            "student_submission_s100_comp1010_assessment-1_s2-2025"
        );
    }
}
