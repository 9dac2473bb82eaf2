/// Resolves when the process is asked to stop (Ctrl+C or SIGTERM).
pub(crate) async fn shutdown_signal() {
    let source = wait_for_signal().await;
    tracing::info!(signal = source, "stop requested, draining");
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(error = %err, "could not register SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return "ctrl_c";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "ctrl_c",
        _ = sigterm.recv() => "sigterm",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl_c"
}
