#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = iviva_rust::run_worker().await {
        eprintln!("iviva-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
