//! Preview server command.

use std::path::PathBuf;

use anyhow::Result;
use ccap_server::serve_dir;

/// Run the serve command.
pub async fn run(port: u16, dir: PathBuf) -> Result<()> {
    serve_dir(&dir, "127.0.0.1", port, true).await?;
    Ok(())
}
