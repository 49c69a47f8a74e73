use crate::errors::AppError;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf};
use tokio::{fs, sync::broadcast};
use tracing::{debug, error};

pub mod keys {
    pub const IS_ADMIN: &str = "isAdmin";
    pub const USER_EMAIL: &str = "userEmail";
    pub const STUDENT_PROFILE: &str = "studentProfile";
    pub const COMPANY_INFO: &str = "companyInfo";
    pub const JOURNAL_ENTRIES: &str = "journalEntries";
    pub const MONTHLY_REPORTS: &str = "monthlyReports";
    pub const PORTFOLIO_PROJECTS: &str = "portfolioProjects";
    pub const GALLERY_ITEMS: &str = "galleryItems";
    pub const MUSIC_PLAYING: &str = "musicPlaying";
}

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum StorageEvent {
    Set { key: String },
    Removed { key: String },
}

/// Persistent string key-value storage, written back whole on every change.
///
/// Mirrors the browser's local storage: values are opaque strings, and
/// structured data lives in them as JSON blobs.
pub struct LocalStore {
    path: PathBuf,
    items: BTreeMap<String, String>,
    events: broadcast::Sender<StorageEvent>,
}

impl LocalStore {
    pub fn new(path: PathBuf, items: BTreeMap<String, String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            path,
            items,
            events,
        }
    }

    pub async fn open(path: PathBuf) -> Self {
        let items = load_items(&path).await;
        Self::new(path, items)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events(&self) -> broadcast::Sender<StorageEvent> {
        self.events.clone()
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    pub async fn set_item(&mut self, key: &str, value: impl Into<String>) -> Result<(), AppError> {
        self.items.insert(key.to_string(), value.into());
        persist_items(&self.path, &self.items).await?;
        self.notify(StorageEvent::Set {
            key: key.to_string(),
        });
        Ok(())
    }

    pub async fn remove_item(&mut self, key: &str) -> Result<(), AppError> {
        if self.items.remove(key).is_none() {
            return Ok(());
        }
        persist_items(&self.path, &self.items).await?;
        self.notify(StorageEvent::Removed {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Parses the JSON blob under `key`. Missing or corrupt values read as
    /// the type's default so a broken key never takes a page down.
    pub fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.items.get(key) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|err| {
                error!("failed to parse stored {key}: {err}");
                T::default()
            }),
            None => T::default(),
        }
    }

    pub async fn save_json<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, raw).await
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get_item(key) == Some("true")
    }

    fn notify(&self, event: StorageEvent) {
        // No subscribers is the common case.
        if self.events.send(event).is_err() {
            debug!("storage event dropped, no listeners");
        }
    }
}

pub async fn load_items(path: &Path) -> BTreeMap<String, String> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(err) => {
                error!("failed to parse storage file: {err}");
                BTreeMap::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => {
            error!("failed to read storage file: {err}");
            BTreeMap::new()
        }
    }
}

pub async fn persist_items(path: &Path, items: &BTreeMap<String, String>) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(items)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn scratch_path(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("pkl_hub_{label}_{}_{nanos}.json", std::process::id()));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_item_survives_reopen() {
        let path = scratch_path("reopen");
        let mut store = LocalStore::open(path.clone()).await;
        store.set_item(keys::MUSIC_PLAYING, "true").await.unwrap();

        let reopened = LocalStore::open(path.clone()).await;
        assert_eq!(reopened.get_item(keys::MUSIC_PLAYING), Some("true"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn corrupt_blob_reads_as_default() {
        let path = scratch_path("corrupt");
        let mut store = LocalStore::open(path.clone()).await;
        store.set_item(keys::JOURNAL_ENTRIES, "{not json").await.unwrap();

        let entries: Vec<crate::models::JournalEntry> = store.load_json(keys::JOURNAL_ENTRIES);
        assert!(entries.is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn writes_publish_events() {
        let path = scratch_path("events");
        let mut store = LocalStore::open(path.clone()).await;
        let mut rx = store.events().subscribe();

        store.set_item(keys::IS_ADMIN, "true").await.unwrap();
        store.remove_item(keys::IS_ADMIN).await.unwrap();
        store.remove_item(keys::IS_ADMIN).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            StorageEvent::Set { key: keys::IS_ADMIN.to_string() }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            StorageEvent::Removed { key: keys::IS_ADMIN.to_string() }
        );
        assert!(rx.try_recv().is_err());
        let _ = std::fs::remove_file(path);
    }
}
