use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::dispatch::DispatchPolicy;
use crate::services::openai::OpenAiService;
use crate::services::viva::VivaEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    ai: OpenAiService,
    viva: VivaEngine,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, ai: OpenAiService) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, ai, viva: VivaEngine::new() }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn ai(&self) -> &OpenAiService {
        &self.inner.ai
    }

    pub(crate) fn viva(&self) -> &VivaEngine {
        &self.inner.viva
    }

    pub(crate) fn dispatch_policy(&self) -> DispatchPolicy {
        let dispatch = self.settings().dispatch();
        DispatchPolicy {
            ready_retries: dispatch.ready_retries,
            ready_delay: Duration::from_secs(dispatch.ready_delay_seconds),
        }
    }
}
