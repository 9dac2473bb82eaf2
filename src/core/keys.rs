//! Composite document keys and their canonical form.
//!
//! Every lookup and storage path goes through [`DocumentKey`] so that
//! uploads named "Assessment 1", "Assessment-1" and "assessment_1" all land
//! on the same record.

/// Lowercase and trim a plain metadata field (unit code, staff/student id).
pub(crate) fn normalize_meta(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Canonicalize a label where `-`, `_` and whitespace are interchangeable
/// separators: lowercase, trim, collapse separator runs to a single `-`.
pub(crate) fn normalize_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_separator = false;
    for ch in value.trim().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_separator = !out.is_empty();
            continue;
        }
        if pending_separator {
            out.push('-');
            pending_separator = false;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DocumentKey {
    pub(crate) unit_code: String,
    pub(crate) assignment: String,
    pub(crate) session_year: String,
    pub(crate) student_id: Option<String>,
}

impl DocumentKey {
    pub(crate) fn new(unit_code: &str, assignment: &str, session_year: &str) -> Self {
        Self {
            unit_code: normalize_meta(unit_code),
            assignment: normalize_label(assignment),
            session_year: normalize_label(session_year),
            student_id: None,
        }
    }

    pub(crate) fn for_student(
        student_id: &str,
        unit_code: &str,
        assignment: &str,
        session_year: &str,
    ) -> Self {
        let mut key = Self::new(unit_code, assignment, session_year);
        key.student_id = Some(normalize_meta(student_id));
        key
    }

    pub(crate) fn with_student(&self, student_id: &str) -> Self {
        let mut key = self.clone();
        key.student_id = Some(normalize_meta(student_id));
        key
    }

    pub(crate) fn without_student(&self) -> Self {
        let mut key = self.clone();
        key.student_id = None;
        key
    }

    /// Stable storage id: `unit_assignment_session`, student-prefixed when
    /// the key carries a student.
    pub(crate) fn storage_id(&self) -> String {
        match &self.student_id {
            Some(student_id) => format!(
                "{student_id}_{}_{}_{}",
                self.unit_code, self.assignment, self.session_year
            ),
            None => format!("{}_{}_{}", self.unit_code, self.assignment, self.session_year),
        }
    }

    /// Serialization key for the advisory lock guarding set creation.
    pub(crate) fn lock_key(&self) -> String {
        format!("{}|{}|{}", self.unit_code, self.assignment, self.session_year)
    }

    /// Question-set name for this key (never includes the student).
    pub(crate) fn set_name(&self) -> String {
        format!("{}_{}_{}", self.unit_code, self.assignment, self.session_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_separators_are_interchangeable() {
        assert_eq!(normalize_label("Assessment 1"), "assessment-1");
        assert_eq!(normalize_label("Assessment-1"), "assessment-1");
        assert_eq!(normalize_label("assessment_1"), "assessment-1");
        assert_eq!(normalize_label("  Assessment  _ 1 "), "assessment-1");
    }

    #[test]
    fn label_keeps_inner_content() {
        assert_eq!(normalize_label("S2 2025"), "s2-2025");
        assert_eq!(normalize_label("comp1010"), "comp1010");
    }

    #[test]
    fn meta_is_trimmed_and_lowercased() {
        assert_eq!(normalize_meta("  COMP1010 "), "comp1010");
    }

    #[test]
    fn keys_with_formatting_variance_are_equal() {
        let a = DocumentKey::new("COMP1010", "Assessment 1", "S2_2025");
        let b = DocumentKey::new("comp1010", "assessment-1", "s2-2025");
        assert_eq!(a, b);
        assert_eq!(a.storage_id(), "comp1010_assessment-1_s2-2025");
    }

    #[test]
    fn student_key_prefixes_storage_id() {
        let key = DocumentKey::for_student("S123", "comp1010", "assessment-1", "s2-2025");
        assert_eq!(key.storage_id(), "s123_comp1010_assessment-1_s2-2025");
        assert_eq!(key.without_student().storage_id(), "comp1010_assessment-1_s2-2025");
    }

    #[test]
    fn lock_key_is_pipe_delimited() {
        let key = DocumentKey::new("comp1010", "assessment-1", "s2-2025");
        assert_eq!(key.lock_key(), "comp1010|assessment-1|s2-2025");
    }
}
