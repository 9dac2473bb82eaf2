pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::openai::OpenAiService;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let ai = OpenAiService::from_settings(&settings)?;
    let state = AppState::new(settings, db_pool, ai);

    spawn_viva_session_reaper(state.clone());

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "IVIVA API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let ai = OpenAiService::from_settings(&settings)?;
    let state = AppState::new(settings, db_pool, ai);

    tracing::info!(
        concurrency = state.settings().worker().concurrency,
        "IVIVA generation worker starting"
    );

    tasks::scheduler::run(state).await
}

/// In-memory viva sessions expire after a TTL; sweep them periodically.
fn spawn_viva_session_reaper(state: AppState) {
    tokio::spawn(async move {
        let ttl = Duration::from_secs(state.settings().viva().session_ttl_minutes * 60);
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let purged = state.viva().purge_expired(ttl).await;
            if purged > 0 {
                tracing::info!(purged, "Expired viva sessions removed");
            }
        }
    });
}
