pub(crate) mod dispatch;
pub(crate) mod document_store;
pub(crate) mod generation;
pub(crate) mod openai;
pub(crate) mod persistence;
pub(crate) mod readiness;
pub(crate) mod viva;
