pub(crate) mod documents;
pub(crate) mod exam_sessions;
pub(crate) mod generation_jobs;
pub(crate) mod question_sets;
pub(crate) mod questions;
