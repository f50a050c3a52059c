//! Conversation storage
//!
//! One JSON file per conversation under the store directory. Every save is
//! a whole-record snapshot written to a temp file in the same directory
//! and renamed into place, so a crash mid-write never leaves a
//! half-written record. This is a correctness requirement, not an
//! optimization.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Conversation, ConversationSummary};

/// Durable, crash-safe persistence of conversation records.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), "conversation store opened");
        Ok(Self { dir })
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist a full conversation snapshot atomically.
    pub async fn save(&self, conversation: &Conversation) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(conversation)?;
        let dir = self.dir.clone();
        let path = self.record_path(conversation.id);

        run_blocking(move || atomic_write(&dir, &path, &bytes)).await?;

        tracing::debug!(conversation = %conversation.id, "saved conversation snapshot");
        Ok(())
    }

    /// Load a conversation, or `None` if no record exists.
    pub async fn load(&self, id: Uuid) -> Result<Option<Conversation>> {
        let path = self.record_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a conversation record. Returns false if it did not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let path = self.record_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Summaries of every stored conversation, most recently updated first.
    /// Unreadable records are skipped with a warning rather than failing
    /// the whole listing.
    pub async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let dir = self.dir.clone();
        let mut summaries = run_blocking(move || {
            let mut summaries = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match read_summary(&path) {
                    Ok(summary) => summaries.push(summary),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable conversation record");
                    }
                }
            }
            Ok::<_, Error>(summaries)
        })
        .await?;

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

fn read_summary(path: &Path) -> Result<ConversationSummary> {
    let bytes = std::fs::read(path)?;
    let conversation: Conversation = serde_json::from_slice(&bytes)?;
    Ok(conversation.summary())
}

/// Write `bytes` to `path` via a temp file in `dir` plus an atomic rename.
fn atomic_write(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::TransientIo(e.error))?;
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::TransientIo(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Role};
    use tempfile::TempDir;

    fn store() -> (ConversationStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::open(dir.path().join("conversations")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let (store, _dir) = store();
        let mut conv = Conversation::new(Some("Iterators".into()), Some("phi-3.5-mini".into()));
        conv.push_message(Message::new(Role::User, "explain iterators", 5));
        conv.push_message(Message::new(Role::Assistant, "an iterator yields items", 6));

        store.save(&conv).await.unwrap();
        let loaded = store.load(conv.id).await.unwrap().unwrap();
        assert_eq!(conv, loaded);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let (store, _dir) = store();
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = store();
        let conv = Conversation::new(None, None);
        store.save(&conv).await.unwrap();

        assert!(store.delete(conv.id).await.unwrap());
        assert!(!store.delete(conv.id).await.unwrap());
        assert!(store.load(conv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_whole_snapshot() {
        let (store, _dir) = store();
        let mut conv = Conversation::new(None, None);
        store.save(&conv).await.unwrap();

        conv.push_message(Message::new(Role::User, "first", 2));
        store.save(&conv).await.unwrap();

        let loaded = store.load(conv.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "first");
    }

    #[tokio::test]
    async fn test_list_sorted_most_recently_updated_first() {
        let (store, _dir) = store();
        let mut first = Conversation::new(Some("first".into()), None);
        let mut second = Conversation::new(Some("second".into()), None);

        first.push_message(Message::new(Role::User, "a", 1));
        store.save(&first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        second.push_message(Message::new(Role::User, "b", 1));
        store.save(&second).await.unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].title.as_deref(), Some("second"));
        assert_eq!(summaries[1].title.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_records() {
        let (store, _dir) = store();
        let conv = Conversation::new(Some("good".into()), None);
        store.save(&conv).await.unwrap();

        let bad = store.record_path(Uuid::new_v4());
        std::fs::write(&bad, b"{ not json").unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (store, _dir) = store();
        let conv = Conversation::new(None, None);
        store.save(&conv).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(store.dir.clone())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }
}
