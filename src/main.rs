use anyhow::Result;
use mindcare::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
