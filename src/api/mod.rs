pub(crate) mod documents;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod questions;
pub(crate) mod router;
pub(crate) mod seed_questions;
pub(crate) mod viva;
