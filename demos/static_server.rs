//! A static file server example serving the current directory on port 8081.

use std::time::Duration;

use log::info;
use microstatic_rs::{Framing, RootDir, ServerConfig, StaticServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    // Start from the defaults and override what this example cares about
    let config = ServerConfig {
        addr: "127.0.0.1:8081".parse()?,
        root: RootDir::new("."),
        max_workers: 64,
        max_connections: 256,
        idle_timeout: Some(Duration::from_secs(2)),
        framing: Framing::Standard,
        ..ServerConfig::default()
    };

    info!("Try: curl -v http://127.0.0.1:8081/Cargo.toml");

    // Bind, then serve until Ctrl+C
    let server = StaticServer::bind(config).await?;
    let stats = server.serve().await?;

    info!("Served {replied} of {accepted} connections", replied = stats.replied, accepted = stats.accepted);
    Ok(())
}
