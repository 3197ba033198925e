//! Feed synchronizer: keeps the displayed feed reconciled with the remote
//! post collection under live insert notifications.
//!
//! The lifecycle is `Idle` until the first refresh, `Fetching` while a fetch
//! is in flight, then `Populated` or `FallbackOnly`. Every insert
//! notification triggers one unconditional full re-fetch; each result
//! replaces the whole displayed feed, it is never appended to. A failed or
//! empty fetch degrades silently to the built-in seed posts.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::post::{CREATED_AT_COLUMN, POSTS_COLLECTION, Post, seed_posts};
use crate::store::{InsertFeed, RemoteStore, SortDirection};

/// Where the synchronizer currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    Populated,
    FallbackOnly,
}

/// Owns the displayed feed and republishes it after every refresh.
///
/// The store is injected at construction so the synchronizer can run against
/// any [`RemoteStore`] implementation.
pub struct FeedSync<S> {
    store: S,
    seeds: Vec<Post>,
    state: SyncState,
    feed_tx: watch::Sender<Vec<Post>>,
}

impl<S: RemoteStore> FeedSync<S> {
    /// Create a synchronizer around an injected store.
    ///
    /// Returns the watch receiver the presentation side reads the displayed
    /// feed from. The feed starts empty; call [`FeedSync::refresh`] to load.
    pub fn new(store: S) -> (Self, watch::Receiver<Vec<Post>>) {
        let (feed_tx, feed_rx) = watch::channel(Vec::new());
        (
            Self {
                store,
                seeds: seed_posts(),
                state: SyncState::Idle,
                feed_tx,
            },
            feed_rx,
        )
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// The currently displayed feed.
    pub fn displayed(&self) -> Vec<Post> {
        self.feed_tx.borrow().clone()
    }

    /// Open the live insert subscription for the post collection.
    ///
    /// Dropping the returned feed releases the subscription. A feed that
    /// ends is not reopened automatically.
    pub fn subscribe(&self) -> InsertFeed {
        self.store.subscribe_inserts(POSTS_COLLECTION)
    }

    /// Re-fetch the post collection and republish the displayed feed.
    ///
    /// Fetch errors are logged and recovered locally by showing seed content
    /// only; nothing is surfaced to the user.
    pub async fn refresh(&mut self) {
        self.state = SyncState::Fetching;

        let fetched = self
            .store
            .select_all(POSTS_COLLECTION, CREATED_AT_COLUMN, SortDirection::Descending)
            .await;

        let feed = match fetched {
            Ok(rows) => {
                let mut posts = Vec::with_capacity(rows.len() + self.seeds.len());
                for row in rows {
                    match Post::from_record(row) {
                        Ok(post) => posts.push(post),
                        Err(e) => warn!("Dropping malformed feed row: {}", e),
                    }
                }
                if posts.is_empty() {
                    self.state = SyncState::FallbackOnly;
                    self.seeds.clone()
                } else {
                    // Seed posts trail every remote post regardless of their
                    // dates; this is a concatenation, not a timestamp merge.
                    posts.extend(self.seeds.iter().cloned());
                    self.state = SyncState::Populated;
                    posts
                }
            }
            Err(e) => {
                warn!("Feed fetch failed, showing seed content: {}", e);
                self.state = SyncState::FallbackOnly;
                self.seeds.clone()
            }
        };

        // The receiver side owns rendering; once it is torn down there is
        // nothing valid left to publish into.
        if self.feed_tx.send(feed).is_err() {
            debug!("Displayed feed receiver dropped; discarding refresh result");
        }
    }
}
