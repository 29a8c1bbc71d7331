use anyhow::{Context, Result};
use runcast_server::{DemoFlow, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment variables
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Run the server using the library's run function
    runcast_server::run(config, DemoFlow::new())
        .await
        .context("Server error")?;

    Ok(())
}
