//! Development server command.

use std::path::PathBuf;

use anyhow::Result;
use ccap_server::{DevServer, DevServerConfig};
use ccap_site::DocsConfig;

/// Run the dev server.
pub async fn run(docs: DocsConfig, config_path: PathBuf, port: u16, open: bool) -> Result<()> {
    tracing::info!("Starting development server on port {}", port);

    let config = DevServerConfig {
        docs,
        config_path,
        port,
        host: "127.0.0.1".to_string(),
        open,
    };

    DevServer::new(config).start().await?;

    Ok(())
}
