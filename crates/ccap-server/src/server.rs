//! Preview server and live-reloading development server.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::services::ServeDir;

use ccap_site::{process_env, BuildResult, DocsConfig, StaticBuilder};

use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{reload_client_script, ReloadHub, ReloadMessage};

const RELOAD_PATH: &str = "/__reload";
const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Docs configuration to build
    pub docs: DocsConfig,

    /// Config file to reload when it changes
    pub config_path: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    Address(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("Directory not found: {0}. Run 'ccap build' first.")]
    MissingDir(String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Shared server state.
struct ServerState {
    hub: ReloadHub,
}

/// Serve a built site.
pub async fn serve_dir(dir: &Path, host: &str, port: u16, open: bool) -> Result<(), ServerError> {
    if !dir.exists() {
        return Err(ServerError::MissingDir(dir.display().to_string()));
    }

    let addr = parse_addr(host, port)?;
    let app = Router::new().fallback_service(ServeDir::new(dir));

    tracing::info!("Serving {} at http://{}", dir.display(), addr);
    listen(addr, app, open).await
}

/// Development server: builds into a temporary directory and rebuilds on change.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Start the development server.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = parse_addr(&self.config.host, self.config.port)?;

        let output = tempfile::Builder::new()
            .prefix("ccap-dev")
            .tempdir()
            .map_err(|e| ServerError::Io(e.to_string()))?;
        let docs = dev_config(&self.config.docs, output.path());

        let state = Arc::new(ServerState {
            hub: ReloadHub::new(),
        });

        match rebuild(docs.clone()).await {
            Ok(result) => tracing::info!("Built {} pages in {}ms", result.pages, result.duration_ms),
            Err(e) => tracing::error!("Build failed: {}", e),
        }

        let (watcher, mut rx) = FileWatcher::new(
            &watch_paths(&docs, &self.config.config_path),
            vec![self.config.docs.build_dir()],
        )
        .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let hub = state.hub.clone();
        let config_path = self.config.config_path.clone();
        let mut current = docs;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::info!("Changed: {}", event.path().display());

                if matches!(event, WatchEvent::ConfigChanged(_)) {
                    match DocsConfig::load(&config_path, &process_env) {
                        Ok(loaded) => {
                            let output = current.build_dir();
                            current = dev_config(&loaded, &output);
                        }
                        Err(e) => {
                            hub.send(ReloadMessage::BuildFailed {
                                message: e.to_string(),
                            });
                            continue;
                        }
                    }
                }

                match rebuild(current.clone()).await {
                    Ok(result) => {
                        tracing::info!("Rebuilt {} pages in {}ms", result.pages, result.duration_ms);
                        hub.send(ReloadMessage::Reload);
                    }
                    Err(message) => {
                        tracing::error!("Build failed: {}", message);
                        hub.send(ReloadMessage::BuildFailed { message });
                    }
                }
            }
            drop(watcher);
        });

        let app = Router::new()
            .route(RELOAD_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
            .fallback_service(ServeDir::new(output.path()))
            .with_state(state);

        tracing::info!("Starting dev server at http://{}", addr);
        let result = listen(addr, app, self.config.open).await;
        drop(output);
        result
    }
}

/// The docs configuration with output redirected to `output` and live reload enabled.
fn dev_config(docs: &DocsConfig, output: &Path) -> DocsConfig {
    let mut config = docs.clone();
    config.build = output.to_path_buf();
    config.minify = false;
    config
}

/// Page sources, module sources and the config file.
fn watch_paths(docs: &DocsConfig, config_path: &Path) -> Vec<PathBuf> {
    let mut paths = vec![docs.source_dir()];
    paths.extend(docs.modules.iter().map(|m| docs.module_dir(m)));
    paths.extend(docs.styles.iter().map(|s| docs.root.join(s)));
    paths.push(config_path.to_path_buf());
    paths
}

async fn rebuild(config: DocsConfig) -> Result<BuildResult, String> {
    tokio::task::spawn_blocking(move || {
        StaticBuilder::new()
            .with_live_reload(RELOAD_SCRIPT_PATH)
            .build(&config)
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())
}

fn parse_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    format!("{}:{}", host, port)
        .parse()
        .map_err(|_| ServerError::Address(format!("{}:{}", host, port)))
}

async fn listen(addr: SocketAddr, app: Router, open: bool) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

    if open {
        let url = format!("http://{}", addr);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Could not open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::BindError(addr, e.to_string()))
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one browser.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Some(msg) = next_message(&mut rx).await {
        if send(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

/// Next message for a browser; a lagging receiver skips what it missed.
async fn next_message(rx: &mut broadcast::Receiver<ReloadMessage>) -> Option<ReloadMessage> {
    loop {
        match rx.recv().await {
            Ok(msg) => return Some(msg),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Reload client skipped {} messages", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Handler for the reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(RELOAD_PATH),
    )
}
