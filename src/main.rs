#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = iviva_rust::run().await {
        eprintln!("iviva-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
