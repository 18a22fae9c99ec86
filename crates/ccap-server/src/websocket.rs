//! Live reload over WebSocket.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// The site was rebuilt; reload the page
    Reload,

    /// The last rebuild failed; the previous output is still being served
    BuildFailed {
        /// Error reported by the builder
        message: String,
    },
}

/// Broadcasts reload messages to every connected browser.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine: nobody has the page open.
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client script that reloads the page when the site is rebuilt.
///
/// Connects to `path` on the host that served the page, shows a banner when a
/// rebuild fails and reconnects after the server restarts.
pub fn reload_client_script(path: &str) -> String {
    format!(
        r#"(function() {{
  'use strict';

  var url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{path}';
  var retries = 0;

  function banner(text) {{
    var el = document.getElementById('ccap-build-error');
    if (!el) {{
      el = document.createElement('pre');
      el.id = 'ccap-build-error';
      el.style.cssText = 'position:fixed;bottom:0;left:0;right:0;margin:0;padding:1rem;' +
        'background:#7a1f1f;color:#fff;z-index:1000;white-space:pre-wrap;';
      document.body.appendChild(el);
    }}
    el.textContent = text;
  }}

  function connect() {{
    var ws = new WebSocket(url);

    ws.onopen = function() {{
      if (retries > 0) location.reload();
      retries = 0;
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') location.reload();
      if (msg.type === 'build_failed') banner('Build failed: ' + msg.message);
    }};

    ws.onclose = function() {{
      if (retries < 10) {{
        retries++;
        setTimeout(connect, 500 * retries);
      }}
    }};
  }}

  connect();
}})();
"#,
        path = path
    )
}
