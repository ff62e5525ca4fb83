//! Hot reload of the configuration file
//!
//! Invalid edits are logged and skipped; the running bindings stay in place
//! until a file that parses and validates is saved.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Delay letting editors finish writing before the file is read again
const DEBOUNCE: Duration = Duration::from_millis(100);

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Arc<AppConfig>>,
}

impl ConfigWatcher {
    /// Load `path` and start watching it
    pub async fn new(path: impl Into<PathBuf>) -> Result<(Self, Arc<AppConfig>)> {
        let path = path.into();
        let display = path.display().to_string();
        let initial = Arc::new(
            AppConfig::load(&display)
                .await
                .context("Failed to load initial config")?,
        );

        let (tx, rx) = mpsc::channel(4);
        // notify calls back on its own thread
        let runtime = tokio::runtime::Handle::current();
        let pending = Arc::new(AtomicBool::new(false));
        let reload_path = display.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("Config watch error: {}", e);
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            // One reload per burst of write events
            if pending.swap(true, Ordering::SeqCst) {
                return;
            }
            debug!("Config file changed: {:?}", event.paths);

            let path = reload_path.clone();
            let tx = tx.clone();
            let pending = pending.clone();
            runtime.spawn(async move {
                tokio::time::sleep(DEBOUNCE).await;
                pending.store(false, Ordering::SeqCst);

                match AppConfig::load(&path).await {
                    Ok(config) => {
                        info!("🔄 Configuration reloaded");
                        if tx.send(Arc::new(config)).await.is_err() {
                            debug!("Config reload listener gone");
                        }
                    }
                    Err(e) => warn!("Keeping previous configuration: {:#}", e),
                }
            });
        })?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", display))?;
        info!("Watching {} for changes", path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial,
        ))
    }

    /// Next valid configuration; `None` once the watcher is gone
    pub async fn next_config(&mut self) -> Option<Arc<AppConfig>> {
        self.rx.recv().await
    }
}
