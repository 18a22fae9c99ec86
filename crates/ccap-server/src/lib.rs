//! Servers for previewing the documentation site.
//!
//! [`serve_dir`] serves a finished build; [`DevServer`] rebuilds the site on
//! every change and reloads connected browsers over a WebSocket.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{serve_dir, DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{reload_client_script, ReloadHub, ReloadMessage};
