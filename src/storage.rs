use crate::errors::StorageError;
use crate::models::{ContactRecord, FollowerRecord, TribeCounter};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

pub const TRIBE_COUNT_FILE: &str = "tribe-count.json";
pub const FOLLOWERS_FILE: &str = "followers.json";
pub const CONTACTS_FILE: &str = "contacts.json";

/// Flat-file store for the tribe counter, follower list and contact list.
///
/// Every read-modify-write goes through [`Store::lock`], so the follower
/// append and counter increment of one request cannot interleave with
/// another request in the same process. The two files are still written one
/// after the other; a crash between the writes leaves them out of step. The
/// lock is per process, so a second process on the same directory is not
/// serialized against this one.
#[derive(Debug)]
pub struct Store {
    dir: PathBuf,
    guard: Mutex<()>,
}

/// Exclusive access to the store for the lifetime of the value.
pub struct StoreTxn<'a> {
    store: &'a Store,
    _guard: MutexGuard<'a, ()>,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tribe_count_path(&self) -> PathBuf {
        self.dir.join(TRIBE_COUNT_FILE)
    }

    pub fn followers_path(&self) -> PathBuf {
        self.dir.join(FOLLOWERS_FILE)
    }

    pub fn contacts_path(&self) -> PathBuf {
        self.dir.join(CONTACTS_FILE)
    }

    /// Creates the data directory and seeds any missing file with its default.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| io_error(&self.dir, source))?;

        let txn = self.lock().await;
        if !exists(&self.tribe_count_path()).await {
            info!("seeding {}", self.tribe_count_path().display());
            txn.write_counter(&TribeCounter::default()).await?;
        }
        if !exists(&self.followers_path()).await {
            txn.write_followers(&[]).await?;
        }
        if !exists(&self.contacts_path()).await {
            txn.write_contacts(&[]).await?;
        }
        Ok(())
    }

    pub async fn lock(&self) -> StoreTxn<'_> {
        StoreTxn {
            store: self,
            _guard: self.guard.lock().await,
        }
    }
}

impl StoreTxn<'_> {
    pub async fn read_counter(&self) -> Result<TribeCounter, StorageError> {
        read_or_default(&self.store.tribe_count_path()).await
    }

    pub async fn write_counter(&self, counter: &TribeCounter) -> Result<(), StorageError> {
        persist(&self.store.tribe_count_path(), counter).await
    }

    pub async fn read_followers(&self) -> Result<Vec<FollowerRecord>, StorageError> {
        read_or_default(&self.store.followers_path()).await
    }

    pub async fn write_followers(&self, followers: &[FollowerRecord]) -> Result<(), StorageError> {
        persist(&self.store.followers_path(), &followers).await
    }

    pub async fn read_contacts(&self) -> Result<Vec<ContactRecord>, StorageError> {
        read_or_default(&self.store.contacts_path()).await
    }

    pub async fn write_contacts(&self, contacts: &[ContactRecord]) -> Result<(), StorageError> {
        persist(&self.store.contacts_path(), &contacts).await
    }
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// A missing file reads as the type's default; anything else unreadable is an error.
async fn read_or_default<T>(path: &Path) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
            path: path.display().to_string(),
            source,
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(io_error(path, err)),
    }
}

async fn persist<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, payload).await.map_err(|err| io_error(path, err))
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_TRIBE_COUNT;
    use chrono::Utc;

    #[tokio::test]
    async fn initialize_seeds_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("data"));
        store.initialize().await.unwrap();

        let txn = store.lock().await;
        assert_eq!(txn.read_counter().await.unwrap().count, DEFAULT_TRIBE_COUNT);
        assert!(txn.read_followers().await.unwrap().is_empty());
        assert!(txn.read_contacts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(TRIBE_COUNT_FILE),
            r#"{"count":7,"lastUpdated":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let store = Store::new(dir.path());
        store.initialize().await.unwrap();
        assert_eq!(store.lock().await.read_counter().await.unwrap().count, 7);
    }

    #[tokio::test]
    async fn followers_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let record = FollowerRecord {
            email: "A@X.com".into(),
            timestamp: Utc::now(),
            source: "test".into(),
            name: None,
        };

        let txn = store.lock().await;
        txn.write_followers(std::slice::from_ref(&record)).await.unwrap();
        assert_eq!(txn.read_followers().await.unwrap(), vec![record]);

        let raw = std::fs::read_to_string(store.followers_path()).unwrap();
        assert!(!raw.contains("\"name\""));
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TRIBE_COUNT_FILE), "not json").unwrap();
        let store = Store::new(dir.path());

        let err = store.lock().await.read_counter().await.unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
    }
}
