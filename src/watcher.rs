use std::path::{Path, PathBuf};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::error::ViewerError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileEvent {
    Changed,
    Removed,
}

/// Collapses bursts of change events into one reload
#[derive(Debug)]
struct Debounce {
    window: Duration,
    pending_since: Option<Instant>,
    removed: bool,
}

impl Debounce {
    fn new(window: Duration) -> Self {
        Self {
            window,
            pending_since: None,
            removed: false,
        }
    }

    fn record(&mut self, event: FileEvent, now: Instant) {
        match event {
            FileEvent::Removed => {
                self.removed = true;
                self.pending_since = None;
            }
            FileEvent::Changed => {
                self.removed = false;
                self.pending_since = Some(now);
            }
        }
    }

    /// True once per burst, after `window` without new events
    fn take_due(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if !self.removed && now.duration_since(since) >= self.window => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches a JSONL log file and yields a signal each time it settles after a change.
///
/// The file may not exist yet; in that case its directory is watched and the
/// first reload fires once the file appears.
pub struct LogFileWatcher {
    path: PathBuf,
    reloads: mpsc::Receiver<()>,
    // Dropping the watcher stops the notify thread and ends the debounce task
    _watcher: RecommendedWatcher,
}

impl LogFileWatcher {
    pub fn start(path: impl Into<PathBuf>, debounce: Duration) -> Result<Self, ViewerError> {
        let path = path.into();
        let file_name = path.file_name().map(|name| name.to_os_string());

        let (event_tx, mut event_rx) = mpsc::channel::<FileEvent>(100);
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("File watch error: {e}");
                        return;
                    }
                };

                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !ours {
                    return;
                }

                let kind = match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) => FileEvent::Changed,
                    EventKind::Remove(_) => FileEvent::Removed,
                    _ => return,
                };
                let _ = event_tx.blocking_send(kind);
            },
            Config::default(),
        )?;

        let watch_path = if path.exists() {
            path.clone()
        } else {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            tracing::info!(
                "Log file doesn't exist yet, watching directory: {}",
                parent.display()
            );
            parent.to_path_buf()
        };
        watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;

        let (reload_tx, reloads) = mpsc::channel::<()>(1);
        let watched = path.clone();
        tokio::spawn(async move {
            let mut debounce = Debounce::new(debounce);
            loop {
                tokio::select! {
                    event = event_rx.recv() => match event {
                        Some(FileEvent::Removed) => {
                            tracing::info!("Log file removed, waiting for recreation");
                            debounce.record(FileEvent::Removed, Instant::now());
                        }
                        Some(event) => {
                            tracing::debug!("Log file changed, scheduling reload");
                            debounce.record(event, Instant::now());
                        }
                        None => break,
                    },
                    _ = tokio::time::sleep(POLL_INTERVAL) => {
                        if debounce.take_due(Instant::now()) {
                            if !watched.exists() {
                                tracing::warn!("Log file does not exist, skipping reload");
                                continue;
                            }
                            // A reload already queued covers this change too
                            if reload_tx.try_send(()).is_err() && reload_tx.is_closed() {
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!("Log file watcher stopped");
        });

        tracing::info!("Watching log file: {}", path.display());
        Ok(Self {
            path,
            reloads,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next settled change. `None` once watching has stopped.
    pub async fn changed(&mut self) -> Option<()> {
        self.reloads.recv().await
    }
}
