//! feed-core: the logic core of the personal feed app.
//!
//! This crate provides the pieces of the app that actually hold state:
//! - The feed data model, seed content, and the record decode boundary
//! - The `RemoteStore` contract over the backend (records, blobs, live
//!   insert notifications) plus an in-memory implementation for tests
//! - The feed synchronizer that keeps the displayed feed reconciled
//! - The post composer and its submission pipeline

pub mod composer;
pub mod post;
pub mod store;
pub mod sync;

pub use composer::{AUTHOR_NAME, Attachment, Composer, IMAGE_BUCKET, SubmitError};
pub use post::{DEFAULT_AUTHOR, MAX_BODY_CHARS, POSTS_COLLECTION, Post, PostId, seed_posts};
pub use store::{
    InsertEvent, InsertFeed, MemoryStore, NewRecord, Record, RemoteStore, SortDirection,
    StoreError, Subscribers,
};
pub use sync::{FeedSync, SyncState};
