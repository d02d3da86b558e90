use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    asc_kit::cli::run_cli().await
}
