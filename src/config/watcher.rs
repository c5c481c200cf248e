//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so editors
//! and deploy tools that replace the file by rename are still picked up.
//! A file that fails to parse or validate is logged and skipped; the rules
//! already in force stay in place until a valid version appears.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatekeeperConfig;

/// Publishes each new valid version of one configuration file.
pub struct ConfigWatcher {
    path: PathBuf,
    current: Option<GatekeeperConfig>,
    update_tx: mpsc::UnboundedSender<GatekeeperConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatekeeperConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current: None,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Treat `config` as already applied, so an unchanged file is not resent.
    pub fn with_current(mut self, config: GatekeeperConfig) -> Self {
        self.current = Some(config);
        self
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsString::from).ok_or_else(|| {
            notify::Error::generic("config path has no file name").add_path(self.path.clone())
        })?;

        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = ?e, "Config watch error");
                        return;
                    }
                };
                if !touches_content(&event.kind)
                    || !event.paths.iter().any(|p| p.file_name() == Some(&*file_name))
                {
                    return;
                }

                match load_config(&watched) {
                    Ok(config) if current.as_ref() == Some(&config) => {}
                    Ok(config) => {
                        tracing::info!(path = ?watched, "Config file changed, reloading rules");
                        current = Some(config.clone());
                        let _ = update_tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(
                            path = ?watched,
                            error = %e,
                            "Rejected config reload, keeping current rules"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn touches_content(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}
