// ABOUTME: keeps the on-disk ledger of completed llm exchanges.
// ABOUTME: serializes read-modify-write cycles so concurrent completions never lose entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    active_tasks: BTreeMap<String, String>,
}

/// Append-only map of synthetic task ids to backend session identifiers.
/// Rewrites go through a temp file and rename under an async mutex; entries
/// are never pruned.
pub struct SessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Writes the empty default structure unless the ledger already exists.
    pub async fn ensure_exists(&self) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.write(&Ledger::default()).await
    }

    /// Appends one completed exchange and returns its task id.
    pub async fn record(&self, session_id: &str) -> anyhow::Result<String> {
        let _guard = self.lock.lock().await;
        let mut ledger = self.read_or_default().await?;
        let task_id = format!("task_{}", ledger.active_tasks.len() + 1);
        ledger
            .active_tasks
            .insert(task_id.clone(), session_id.to_string());
        self.write(&ledger).await?;
        Ok(task_id)
    }

    async fn read_or_default(&self) -> anyhow::Result<Ledger> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("decode session ledger at {}", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Ledger::default()),
            Err(err) => Err(err)
                .with_context(|| format!("read session ledger at {}", self.path.display())),
        }
    }

    async fn write(&self, ledger: &Ledger) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(ledger)?;
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("write session ledger at {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace session ledger at {}", self.path.display()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn ensure_exists_writes_the_default_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = SessionStore::new(&path);
        store.ensure_exists().await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(v["active_tasks"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_exists_leaves_an_existing_ledger_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = SessionStore::new(&path);
        store.record("sess-1").await.unwrap();
        store.ensure_exists().await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["active_tasks"]["task_1"], "sess-1");
    }

    #[tokio::test]
    async fn record_creates_the_ledger_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = SessionStore::new(&path);
        let task_id = store.record("sess-1").await.unwrap();
        assert_eq!(task_id, "task_1");

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["active_tasks"]["task_1"], "sess-1");
    }

    #[tokio::test]
    async fn task_ids_are_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));

        assert_eq!(store.record("a").await.unwrap(), "task_1");
        assert_eq!(store.record("b").await.unwrap(), "task_2");
        assert_eq!(store.record("c").await.unwrap(), "task_3");
    }

    #[tokio::test]
    async fn concurrent_records_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let store = Arc::new(SessionStore::new(&path));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.record(&format!("sess-{i}")).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["active_tasks"].as_object().unwrap().len(), 8);
    }
}
