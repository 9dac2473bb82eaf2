use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level; noisy dependency targets are capped at warn unless overridden.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},hyper=warn,reqwest=warn,sqlx=warn",
            level = settings.telemetry().log_level
        ))
    });

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if settings.telemetry().json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}
