use anyhow::{Context, Result};
use chatd::{Config, Server, ServerContext};
use log::info;
use std::sync::Arc;

fn main() -> Result<()> {
    let config = Config::default();
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .init();

    let listen_addr = *config.listen_addr();
    let context = Arc::new(ServerContext::bootstrap(&config).context("failed to start chatd")?);
    info!("command registry loaded, starting server on {}", listen_addr);

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let server = Server::new(context, listen_addr);
        server.run().await
    })?;

    Ok(())
}
