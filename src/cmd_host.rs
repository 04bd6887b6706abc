//! Native messaging host command.

use std::error::Error;

use tracing::info;

use monica_config::BridgeConfig;
use monica_host::{HostRouter, serve};
use monica_store::open_store;

/// Serve extension requests on stdin/stdout until the browser closes the pipe.
pub(crate) async fn run_host(config: &BridgeConfig) -> Result<(), Box<dyn Error>> {
    let store = open_store(&config.storage).await?;
    let router = HostRouter::new(store);

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let answered = serve(&mut stdin, &mut stdout, &router, config.host.max_message_bytes).await?;

    info!("Native messaging host exiting after {} request(s)", answered);
    Ok(())
}
