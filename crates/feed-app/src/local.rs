//! File-backed store implementation for the app binary.
//!
//! Records live in `<data-dir>/<collection>.json` as a JSON array in the
//! persisted record schema; blobs land under `<data-dir>/blobs/`. Insert
//! notifications are delivered in-process through the shared subscriber
//! registry, so a running app sees its own inserts the same way it would see
//! remote ones.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use feed_core::store::{
    InsertEvent, InsertFeed, NewRecord, Record, RemoteStore, Result, SortDirection, StoreError,
    Subscribers,
};

/// Store backed by JSON files under a data directory.
pub struct LocalStore {
    root: PathBuf,
    subscribers: Arc<Subscribers>,
    /// Serializes read-modify-write cycles on the record files.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            subscribers: Arc::new(Subscribers::new()),
            write_lock: Mutex::new(()),
        }
    }

    fn records_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    fn blob_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join("blobs").join(bucket).join(key)
    }

    async fn load(&self, collection: &str) -> Result<Vec<Record>> {
        let path = self.records_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Rejected(format!("corrupt {} store: {}", collection, e)))
    }

    async fn save(&self, collection: &str, records: &[Record]) -> Result<()> {
        let path = self.records_path(collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;
        }

        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn insert(&self, collection: &str, record: NewRecord) -> Result<i64> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load(collection).await?;
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(Record {
            id,
            name: Some(record.name),
            body: Some(record.body),
            photo_url: record.photo_url,
            created_at: Utc::now(),
        });
        self.save(collection, &records).await?;

        self.subscribers.emit(InsertEvent {
            collection: collection.to_string(),
            id,
        });

        Ok(id)
    }

    async fn select_all(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<Record>> {
        if order_by != "created_at" {
            return Err(StoreError::Rejected(format!(
                "unsupported order column: {}",
                order_by
            )));
        }

        let mut records = self.load(collection).await?;
        records.sort_by_key(|r| r.created_at);
        if direction == SortDirection::Descending {
            records.reverse();
        }
        Ok(records)
    }

    async fn upload_blob(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.blob_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Blob(e.to_string()))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| StoreError::Blob(e.to_string()))
    }

    fn resolve_public_url(&self, bucket: &str, key: &str) -> String {
        format!("file://{}", self.blob_path(bucket, key).display())
    }

    fn subscribe_inserts(&self, collection: &str) -> InsertFeed {
        self.subscribers.subscribe(collection)
    }
}
