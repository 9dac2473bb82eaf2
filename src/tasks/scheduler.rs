use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::state::AppState;
use crate::tasks::generation;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let concurrency = state.settings().worker().concurrency as usize;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        handles.push(tokio::spawn(generation_worker(state.clone(), shutdown_rx.clone())));
    }

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn generation_worker(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let poll_interval = Duration::from_secs(state.settings().worker().poll_interval_seconds);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match generation::claim_next_job(state.db()).await {
            Ok(Some(job)) => {
                let outcome = generation::process_job(&state, &job).await;
                if let Err(err) = generation::finish_job(&state, &job, outcome).await {
                    tracing::error!(
                        job_id = %job.id,
                        error = %err,
                        "Failed to finalize generation job"
                    );
                }
                continue;
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "Failed to claim generation job"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(poll_interval) => {}
        }
    }
}
