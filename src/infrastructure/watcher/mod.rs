//! Touch-reload watcher
//!
//! Polls watched files for modification and enqueues a reload request for
//! the owning module. The watcher never touches the registry itself; the
//! dispatch loop drains the requests between events.

use crate::modules::manager::ReloadRequest;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct TouchWatcher {
    targets: Vec<(String, PathBuf)>,
    period: Duration,
    reloads: mpsc::UnboundedSender<ReloadRequest>,
}

impl TouchWatcher {
    pub fn new(reloads: mpsc::UnboundedSender<ReloadRequest>) -> Self {
        Self {
            targets: Vec::new(),
            period: Duration::from_secs(1),
            reloads,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Watch a file; a modification requests a reload of `module`
    pub fn watch(&mut self, module: &str, path: PathBuf) {
        self.targets.push((module.to_string(), path));
    }

    /// Start polling. The task ends when the reload channel closes.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut seen: HashMap<PathBuf, SystemTime> = HashMap::new();
            for (_, path) in &self.targets {
                if let Some(modified) = mtime(path) {
                    seen.insert(path.clone(), modified);
                }
            }

            let mut ticker = tokio::time::interval(self.period);
            loop {
                ticker.tick().await;
                for (module, path) in &self.targets {
                    let Some(current) = mtime(path) else {
                        continue;
                    };
                    match seen.insert(path.clone(), current) {
                        Some(previous) if previous != current => {
                            warn!("{} was modified, reloading", module);
                            let request = ReloadRequest {
                                name: module.clone(),
                            };
                            if self.reloads.send(request).is_err() {
                                return;
                            }
                        }
                        _ => {}
                    }
                }
            }
        })
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_modification_requests_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.json");
        std::fs::write(&path, "{}").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = TouchWatcher::new(tx).with_period(Duration::from_millis(10));
        watcher.watch("echo", path.clone());
        let task = watcher.spawn();

        // no request until the file actually changes
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());

        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        let request = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no reload request")
            .unwrap();
        assert_eq!(request.name, "echo");
        task.abort();
    }

    #[tokio::test]
    async fn test_watcher_stops_when_channel_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ping.json");
        std::fs::write(&path, "{}").unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = TouchWatcher::new(tx).with_period(Duration::from_millis(10));
        watcher.watch("ping", path.clone());
        let task = watcher.spawn();

        drop(rx);
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        timeout(Duration::from_secs(2), task)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
