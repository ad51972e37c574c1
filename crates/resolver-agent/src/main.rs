mod config;
mod fixture;
mod server;

use anyhow::Result;
use config::{parse_args, runtime_sock_path};
use fixture::Fixture;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = parse_args()?;
    let sock_path = config.socket.clone().unwrap_or_else(runtime_sock_path);

    let fixture = Fixture::load(&config.fixture, config.page_size)?;
    tracing::info!(
        fixture = %config.fixture.display(),
        page_size = config.page_size,
        "serving fixture"
    );

    // Clean stale socket
    let _ = std::fs::remove_file(&sock_path);

    server::run(&sock_path, Arc::new(fixture)).await
}
