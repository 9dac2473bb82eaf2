use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and register metric help text. A no-op
/// when the exporter is disabled or already installed.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || RECORDER.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!("http_requests_total", "Finished HTTP requests by status");
    describe_histogram!("http_request_duration_seconds", "HTTP request latency in seconds");
    describe_counter!("dispatch_jobs_enqueued_total", "Generation jobs enqueued by the dispatcher");
    describe_counter!("dispatch_not_ready_total", "Dispatches skipped because staff documents were missing");
    describe_counter!("generation_jobs_total", "Finished generation jobs by status");
    describe_counter!("openai_requests_total", "Chat completion calls by outcome");
    describe_counter!("viva_sessions_started_total", "Viva sessions opened");
    describe_counter!("viva_sessions_completed_total", "Viva sessions graded to completion");

    let _ = RECORDER.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    RECORDER.get().map(PrometheusHandle::render)
}
