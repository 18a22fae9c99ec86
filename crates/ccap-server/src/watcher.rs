//! File watching for live reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// A change that requires a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A Markdown page changed
    PageChanged(PathBuf),

    /// A module source changed (docstrings may differ)
    SourceChanged(PathBuf),

    /// The docs configuration changed
    ConfigChanged(PathBuf),

    /// A file was created or removed
    TreeChanged(PathBuf),

    /// Any other modification, e.g. a stylesheet
    Modified(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::PageChanged(p)
            | Self::SourceChanged(p)
            | Self::ConfigChanged(p)
            | Self::TreeChanged(p)
            | Self::Modified(p) => p,
        }
    }
}

/// Watches the docs sources and module sources.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively, ignoring anything under `ignore`.
    ///
    /// Returns the watcher and a channel to receive events. Bursts of
    /// filesystem events are coalesced within a short debounce window.
    pub fn new(
        paths: &[PathBuf],
        ignore: Vec<PathBuf>,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(64);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
                tracing::debug!("Watching {}", path.display());
            } else {
                tracing::warn!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            let debounce = Duration::from_millis(100);
            let mut last_sent: Option<Instant> = None;

            while let Ok(event) = sync_rx.recv() {
                for path in &event.paths {
                    if ignore.iter().any(|dir| path.starts_with(dir)) {
                        continue;
                    }
                    let Some(watch_event) = classify_event(path, &event.kind) else {
                        continue;
                    };

                    let now = Instant::now();
                    if last_sent.is_some_and(|t| now.duration_since(t) < debounce) {
                        continue;
                    }
                    last_sent = Some(now);

                    if async_tx.blocking_send(watch_event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.starts_with('.') || name.ends_with('~') {
        return None;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => Some(WatchEvent::TreeChanged(path.to_path_buf())),
        EventKind::Modify(_) => Some(match ext {
            "md" => WatchEvent::PageChanged(path.to_path_buf()),
            "jl" => WatchEvent::SourceChanged(path.to_path_buf()),
            _ if name == "docs.toml" => WatchEvent::ConfigChanged(path.to_path_buf()),
            _ => WatchEvent::Modified(path.to_path_buf()),
        }),
        _ => None,
    }
}
