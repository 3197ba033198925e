//! Remote store contract: records, blobs, and live insert notifications.
//!
//! The backend itself is an external collaborator. This module defines the
//! capability trait the core consumes, the persisted record schema, and
//! `MemoryStore`, an in-memory implementation used by tests.
//!
//! Live updates are delivered as a message-passing channel: a store hands out
//! an [`InsertFeed`] per subscription, and dropping the feed releases the
//! subscription. There is no reconnection; once the store side goes away the
//! feed simply ends.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("blob storage error: {0}")]
    Blob(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Fields of a record to insert. `id` and `created_at` are store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub name: String,
    pub body: String,
    pub photo_url: Option<String>,
}

/// A persisted row of the post collection.
///
/// `name` and `body` are nullable at the wire so the decode boundary can
/// apply its rules per row instead of failing the whole fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub name: Option<String>,
    pub body: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sort order for [`RemoteStore::select_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Notification that a record was inserted into a collection.
#[derive(Debug, Clone)]
pub struct InsertEvent {
    pub collection: String,
    pub id: i64,
}

/// Capability abstraction over the remote record store, blob store, and
/// live-update channel.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a record, returning its store-assigned id.
    async fn insert(&self, collection: &str, record: NewRecord) -> Result<i64>;

    /// Fetch every record of a collection, ordered by `order_by`.
    async fn select_all(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<Record>>;

    /// Upload binary data under `key` in `bucket`.
    async fn upload_blob(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()>;

    /// Resolve the public address of an uploaded blob.
    ///
    /// The address is derived rather than looked up, so this never fails.
    fn resolve_public_url(&self, bucket: &str, key: &str) -> String;

    /// Subscribe to insert notifications for a collection.
    fn subscribe_inserts(&self, collection: &str) -> InsertFeed;
}

// Allows sharing one store between the synchronizer and the composer.
#[async_trait]
impl<T: RemoteStore> RemoteStore for Arc<T> {
    async fn insert(&self, collection: &str, record: NewRecord) -> Result<i64> {
        (**self).insert(collection, record).await
    }

    async fn select_all(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<Record>> {
        (**self).select_all(collection, order_by, direction).await
    }

    async fn upload_blob(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        (**self).upload_blob(bucket, key, data).await
    }

    fn resolve_public_url(&self, bucket: &str, key: &str) -> String {
        (**self).resolve_public_url(bucket, key)
    }

    fn subscribe_inserts(&self, collection: &str) -> InsertFeed {
        (**self).subscribe_inserts(collection)
    }
}

/// A live stream of insert notifications scoped to one collection.
///
/// Dropping the feed releases the underlying subscription.
pub struct InsertFeed {
    collection: String,
    rx: mpsc::UnboundedReceiver<InsertEvent>,
    _guard: SubscriptionGuard,
}

impl InsertFeed {
    /// Wait for the next insert in this feed's collection.
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<InsertEvent> {
        loop {
            let event = self.rx.recv().await?;
            if event.collection == self.collection {
                return Some(event);
            }
        }
    }
}

/// Removes the subscriber from its registry when dropped.
struct SubscriptionGuard {
    registry: Weak<Subscribers>,
    id: usize,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

/// Registry of live insert subscribers.
///
/// Store implementations embed one of these behind an `Arc` and call
/// [`Subscribers::emit`] after every successful insert.
pub struct Subscribers {
    channels: RwLock<Vec<(usize, mpsc::UnboundedSender<InsertEvent>)>>,
    next_id: AtomicUsize,
}

impl Default for Subscribers {
    fn default() -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription scoped to `collection`.
    pub fn subscribe(self: &Arc<Self>, collection: &str) -> InsertFeed {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, tx));
        InsertFeed {
            collection: collection.to_string(),
            rx,
            _guard: SubscriptionGuard {
                registry: Arc::downgrade(self),
                id,
            },
        }
    }

    /// Deliver an event to every open subscription.
    pub fn emit(&self, event: InsertEvent) {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        for (_, tx) in channels.iter() {
            let _ = tx.send(event.clone());
        }
    }

    /// Number of open subscriptions.
    pub fn count(&self) -> usize {
        self.channels.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn unsubscribe(&self, id: usize) {
        // try_write avoids deadlock if Drop runs while emit holds the lock.
        if let Ok(mut guard) = self.channels.try_write() {
            guard.retain(|(i, _)| *i != id);
        }
    }
}

/// In-memory store for tests.
///
/// Assigns ids sequentially and timestamps from a fixed base clock that
/// advances one minute per insert, so insertion order and `created_at` order
/// agree and are deterministic.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    ticks: AtomicI64,
    subscribers: Arc<Subscribers>,
    fail_select: AtomicBool,
    fail_insert: AtomicBool,
    fail_upload: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            blobs: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            ticks: AtomicI64::new(0),
            subscribers: Arc::new(Subscribers::new()),
            fail_select: AtomicBool::new(false),
            fail_insert: AtomicBool::new(false),
            fail_upload: AtomicBool::new(false),
        }
    }

    /// Make subsequent `select_all` calls fail with a transport error.
    pub fn fail_selects(&self, fail: bool) {
        self.fail_select.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent `insert` calls fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent `upload_blob` calls fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::Relaxed);
    }

    /// Push a raw row, bypassing id and timestamp assignment. No
    /// notification is emitted; this is for test fixtures only.
    pub fn insert_raw(&self, collection: &str, record: Record) {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections.entry(collection.to_string()).or_default().push(record);
    }

    /// Direct row access for assertions.
    pub fn records(&self, collection: &str) -> Vec<Record> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        collections.get(collection).cloned().unwrap_or_default()
    }

    /// Stored blob contents, if any.
    pub fn blob(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs.get(&format!("{}/{}", bucket, key)).cloned()
    }

    /// Keys stored under a bucket.
    pub fn blob_keys(&self, bucket: &str) -> Vec<String> {
        let prefix = format!("{}/", bucket);
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(String::from))
            .collect()
    }

    /// Number of open insert subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        Utc.with_ymd_and_hms(2025, 10, 22, 8, 0, 0).unwrap() + TimeDelta::minutes(tick)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn insert(&self, collection: &str, record: NewRecord) -> Result<i64> {
        if self.fail_insert.load(Ordering::Relaxed) {
            return Err(StoreError::Rejected("insert disabled".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let row = Record {
            id,
            name: Some(record.name),
            body: Some(record.body),
            photo_url: record.photo_url,
            created_at: self.timestamp(),
        };

        {
            let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
            collections.entry(collection.to_string()).or_default().push(row);
        }

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
        if self.fail_select.load(Ordering::Relaxed) {
            return Err(StoreError::Transport("select disabled".to_string()));
        }
        if order_by != "created_at" {
            return Err(StoreError::Rejected(format!(
                "unsupported order column: {}",
                order_by
            )));
        }

        let mut records = self.records(collection);
        records.sort_by_key(|r| r.created_at);
        if direction == SortDirection::Descending {
            records.reverse();
        }
        Ok(records)
    }

    async fn upload_blob(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        if self.fail_upload.load(Ordering::Relaxed) {
            return Err(StoreError::Blob("upload disabled".to_string()));
        }
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        blobs.insert(format!("{}/{}", bucket, key), data);
        Ok(())
    }

    fn resolve_public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }

    fn subscribe_inserts(&self, collection: &str) -> InsertFeed {
        self.subscribers.subscribe(collection)
    }
}
