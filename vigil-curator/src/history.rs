//! Process-local decision history
//!
//! Maps alert id to the reviewer's terminal decision. The store consults it
//! only for alerts whose clean artifact has already left the alert directory;
//! disk always wins for the pending/not-pending distinction.
//!
//! Without a history log the map starts empty on every process start, so
//! alerts decided in an earlier lifetime report ARCHIVED. With a log, each
//! decision is appended as one JSON line and replayed at startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use vigil_common::AlertStatus;

/// Reviewer verdict on an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Confirmed,
    Dismissed,
}

impl Decision {
    pub fn from_is_threat(is_threat: bool) -> Self {
        if is_threat {
            Decision::Confirmed
        } else {
            Decision::Dismissed
        }
    }

    pub fn status(&self) -> AlertStatus {
        match self {
            Decision::Confirmed => AlertStatus::Confirmed,
            Decision::Dismissed => AlertStatus::Dismissed,
        }
    }
}

/// One line of the history log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub status: Decision,
    pub decided_at: DateTime<Utc>,
}

/// Append-only JSON-lines file backing the history
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the log. Later lines win; unparseable lines are skipped.
    pub async fn replay(&self) -> io::Result<HashMap<String, Decision>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };

        let mut entries = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => {
                    entries.insert(entry.id, entry.status);
                }
                Err(e) => {
                    warn!(
                        "Skipping malformed history line {} in {}: {}",
                        idx + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }
        Ok(entries)
    }

    pub async fn append(&self, entry: &HistoryEntry) -> io::Result<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn truncate(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Alert id → terminal decision, for the lifetime of the process
#[derive(Debug, Default)]
pub struct ProcessLocalHistory {
    entries: HashMap<String, Decision>,
    log: Option<HistoryLog>,
}

impl ProcessLocalHistory {
    /// Empty, in-memory only
    pub fn new() -> Self {
        Self::default()
    }

    /// Backed by a log file, pre-populated from its contents
    pub async fn with_log(log: HistoryLog) -> io::Result<Self> {
        let entries = log.replay().await?;
        info!(
            "Replayed {} decisions from {}",
            entries.len(),
            log.path().display()
        );
        Ok(Self {
            entries,
            log: Some(log),
        })
    }

    pub fn get(&self, id: &str) -> Option<Decision> {
        self.entries.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record (or overwrite) a decision.
    ///
    /// The in-memory entry is always updated; a failed log append is logged
    /// and returned so the caller can decide whether to surface it.
    pub async fn record(&mut self, id: &str, decision: Decision) -> io::Result<()> {
        self.entries.insert(id.to_string(), decision);

        if let Some(log) = &self.log {
            let entry = HistoryEntry {
                id: id.to_string(),
                status: decision,
                decided_at: Utc::now(),
            };
            if let Err(e) = log.append(&entry).await {
                warn!("Failed to append decision for {} to history log: {}", id, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Forget every decision (and the log contents, if any)
    pub async fn clear(&mut self) -> io::Result<()> {
        self.entries.clear();
        if let Some(log) = &self.log {
            log.truncate().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_overwrites() {
        let mut history = ProcessLocalHistory::new();
        history.record("alert_1", Decision::Confirmed).await.unwrap();
        history.record("alert_1", Decision::Dismissed).await.unwrap();

        assert_eq!(history.get("alert_1"), Some(Decision::Dismissed));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_forgets_everything() {
        let mut history = ProcessLocalHistory::new();
        history.record("alert_1", Decision::Confirmed).await.unwrap();
        history.clear().await.unwrap();

        assert!(history.is_empty());
        assert_eq!(history.get("alert_1"), None);
    }

    #[tokio::test]
    async fn test_log_survives_new_instance() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("history.jsonl"));

        let mut first = ProcessLocalHistory::with_log(log.clone()).await.unwrap();
        first.record("alert_1", Decision::Confirmed).await.unwrap();
        first.record("alert_2", Decision::Dismissed).await.unwrap();
        first.record("alert_1", Decision::Dismissed).await.unwrap();
        drop(first);

        let second = ProcessLocalHistory::with_log(log).await.unwrap();
        assert_eq!(second.get("alert_1"), Some(Decision::Dismissed));
        assert_eq!(second.get("alert_2"), Some(Decision::Dismissed));
    }

    #[tokio::test]
    async fn test_replay_skips_garbage_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.jsonl");
        std::fs::write(
            &path,
            "not json\n{\"id\":\"alert_9\",\"status\":\"confirmed\",\"decided_at\":\"2025-01-01T00:00:00Z\"}\n",
        )
        .unwrap();

        let history = ProcessLocalHistory::with_log(HistoryLog::new(&path)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.get("alert_9"), Some(Decision::Confirmed));
    }

    #[tokio::test]
    async fn test_clear_truncates_log() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("history.jsonl"));

        let mut history = ProcessLocalHistory::with_log(log.clone()).await.unwrap();
        history.record("alert_1", Decision::Confirmed).await.unwrap();
        history.clear().await.unwrap();

        let reloaded = ProcessLocalHistory::with_log(log).await.unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_decision_status_mapping() {
        assert_eq!(Decision::from_is_threat(true).status(), AlertStatus::Confirmed);
        assert_eq!(Decision::from_is_threat(false).status(), AlertStatus::Dismissed);
    }
}
