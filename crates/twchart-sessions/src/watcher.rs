use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::store::{load_session_from_file, log_id};
use crate::thermoworks::RowPolicy;

/// Emitted when a stored log or its sensor CSV changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionLoaded {
        id: String,
        name: String,
        stages: usize,
    },
    SessionFailed {
        id: String,
        error: String,
    },
}

/// Watches a sessions directory and reloads sessions as their files change.
pub struct SessionWatcher {
    tx: broadcast::Sender<SessionEvent>,
    _watcher: RecommendedWatcher,
}

impl SessionWatcher {
    pub fn with_dir(sessions_dir: PathBuf) -> Result<Self> {
        Self::with_policy(sessions_dir, RowPolicy::default())
    }

    pub fn with_policy(sessions_dir: PathBuf, policy: RowPolicy) -> Result<Self> {
        let (tx, _) = broadcast::channel(256);
        let tx_clone = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => Self::handle_event(&tx_clone, &event, policy),
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })?;

        watcher
            .watch(&sessions_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", sessions_dir))?;
        tracing::debug!("Watching {:?}", sessions_dir);

        Ok(Self {
            tx,
            _watcher: watcher,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    fn handle_event(tx: &broadcast::Sender<SessionEvent>, event: &Event, policy: RowPolicy) {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }

        let mut logs: Vec<PathBuf> = event.paths.iter().filter_map(|p| changed_log(p)).collect();
        logs.dedup();

        for path in logs {
            if let Some(evt) = reload(&path, policy) {
                // No subscribers is not an error.
                let _ = tx.send(evt);
            }
        }
    }
}

/// The log a changed `.txt` or `.csv` belongs to.
fn changed_log(path: &Path) -> Option<PathBuf> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("txt") => Some(path.to_path_buf()),
        Some("csv") => Some(path.with_extension("txt")),
        _ => None,
    }
}

fn reload(path: &Path, policy: RowPolicy) -> Option<SessionEvent> {
    let id = log_id(path)?;
    if !path.exists() {
        return None;
    }

    Some(match load_session_from_file(path, policy) {
        Ok(session) => SessionEvent::SessionLoaded {
            id,
            name: session.name,
            stages: session.stages.len(),
        },
        Err(e) => SessionEvent::SessionFailed {
            id,
            error: format!("{:#}", e),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn csv_change_maps_to_its_log() {
        assert_eq!(
            changed_log(Path::new("/s/abc.csv")),
            Some(PathBuf::from("/s/abc.txt"))
        );
        assert_eq!(
            changed_log(Path::new("/s/abc.txt")),
            Some(PathBuf::from("/s/abc.txt"))
        );
        assert_eq!(changed_log(Path::new("/s/abc.json")), None);
    }

    #[test]
    fn reload_reports_loaded_and_failed() {
        let dir = TempDir::new().unwrap();

        let good = dir.path().join("good.txt");
        fs::write(&good, "Ciabatta\nDate: 2025-05-24\nBake: 10:30AM\nDone: 10:55AM\n").unwrap();
        assert_eq!(
            reload(&good, RowPolicy::Skip),
            Some(SessionEvent::SessionLoaded {
                id: "good".into(),
                name: "Ciabatta".into(),
                stages: 1,
            })
        );

        let bad = dir.path().join("bad.txt");
        fs::write(&bad, "Ciabatta\nBake: whenever\n").unwrap();
        let Some(SessionEvent::SessionFailed { id, error }) = reload(&bad, RowPolicy::Skip) else {
            panic!("expected a failed reload");
        };
        assert_eq!(id, "bad");
        assert!(error.contains("line 2"));

        // A CSV without its log yields nothing.
        assert_eq!(reload(&dir.path().join("orphan.txt"), RowPolicy::Skip), None);
    }

    #[tokio::test]
    async fn watcher_reports_log_moved_into_dir() {
        let watched = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let watcher = SessionWatcher::with_dir(watched.path().to_path_buf()).unwrap();
        let mut events = watcher.subscribe();

        let staged = staging.path().join("bake.txt");
        fs::write(&staged, "Ciabatta\nDate: 2025-05-24\nBake: 10:30AM\n").unwrap();
        fs::rename(&staged, watched.path().join("bake.txt")).unwrap();

        let loaded = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            loop {
                if let Ok(SessionEvent::SessionLoaded { id, name, stages }) = events.recv().await {
                    if name == "Ciabatta" {
                        return (id, stages);
                    }
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(loaded, ("bake".to_string(), 1));
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = SessionEvent::SessionFailed {
            id: "abc".into(),
            error: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "session_failed");
        assert_eq!(json["id"], "abc");
    }
}
