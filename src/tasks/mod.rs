pub(crate) mod generation;
pub(crate) mod scheduler;
