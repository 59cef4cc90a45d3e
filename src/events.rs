//! Change notifications
//!
//! The cache reports every mutation to an optional [`ChangeSink`] so that
//! dependents (open editors, a reload trigger) can react. [`JournalSink`]
//! is the built-in sink: it appends one JSON line per event.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// A mutation of the path/address mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum CacheEvent {
    /// Storage was wiped and recreated
    Reset { provider: String, base: String },
    /// A path was (re)cached
    Created { path: String, address: String },
    /// Paths that are no longer cached, including partial removals
    Removed { paths: Vec<String> },
    /// `(from, to)` pairs that were moved
    Renamed { moves: Vec<(String, String)> },
    /// Paths cached by a bulk import
    Imported { paths: Vec<String> },
}

impl CacheEvent {
    /// Short event name
    pub fn name(&self) -> &'static str {
        match self {
            CacheEvent::Reset { .. } => "reset",
            CacheEvent::Created { .. } => "created",
            CacheEvent::Removed { .. } => "removed",
            CacheEvent::Renamed { .. } => "renamed",
            CacheEvent::Imported { .. } => "imported",
        }
    }
}

/// Receives cache change notifications
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn notify(&self, event: &CacheEvent);
}

/// File-based sink that appends JSON lines
pub struct JournalSink {
    enabled: bool,
    path: PathBuf,
}

impl JournalSink {
    /// Create a journal writing to `path`
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            enabled,
            path: path.into(),
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ChangeSink for JournalSink {
    /// Journal failures are logged and dropped; they never fail a cache
    /// operation.
    async fn notify(&self, event: &CacheEvent) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize cache event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write cache journal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn journal_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("journal.log");
        let sink = JournalSink::new(&path, true);

        sink.notify(&CacheEvent::Removed {
            paths: vec!["/p/a".to_string()],
        })
        .await;
        sink.notify(&CacheEvent::Renamed {
            moves: vec![("/p/b".to_string(), "/p/c".to_string())],
        })
        .await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"]["event"], "removed");
        assert_eq!(first["event"]["data"]["paths"][0], "/p/a");
        assert!(first["timestamp"].is_string());
    }

    #[tokio::test]
    async fn disabled_journal_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        let sink = JournalSink::new(&path, false);

        sink.notify(&CacheEvent::Imported { paths: vec![] }).await;
        assert!(!path.exists());
    }

    #[test]
    fn event_names() {
        let event = CacheEvent::Created {
            path: "/a".to_string(),
            address: "blob:x".to_string(),
        };
        assert_eq!(event.name(), "created");
    }
}
