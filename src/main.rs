//! `microstatic` binary.
//!
//! Usage: `microstatic -h <ipv4> -p <port> -d <root> [-c <config.json>]`

use log::info;
use microstatic_rs::{ServerConfig, StaticServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    let config = ServerConfig::from_args(std::env::args().skip(1))?;
    let server = StaticServer::bind(config).await?;
    let stats = server.serve().await?;

    info!(
        "Served {replied} replies over {accepted} connections",
        replied = stats.replied,
        accepted = stats.accepted
    );
    Ok(())
}
