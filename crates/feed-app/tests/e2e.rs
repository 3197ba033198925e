//! End-to-end tests for feed-app.
//!
//! Exercises the full flow against the file-backed store: compose and
//! submit, receive the insert notification, re-fetch, and render.

use std::sync::Arc;
use std::time::Duration;

use feed_app::local::LocalStore;
use feed_app::render;
use feed_core::{AUTHOR_NAME, Attachment, Composer, FeedSync, SyncState, seed_posts};
use tempfile::TempDir;
use tokio::time::timeout;

fn open_store(dir: &TempDir) -> Arc<LocalStore> {
    Arc::new(LocalStore::new(dir.path().to_path_buf()))
}

#[tokio::test]
async fn test_fresh_store_shows_seed_content_only() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let (mut sync, _feed_rx) = FeedSync::new(store);
    sync.refresh().await;

    assert_eq!(sync.state(), SyncState::FallbackOnly);
    assert_eq!(sync.displayed(), seed_posts());
}

#[tokio::test]
async fn test_submit_notifies_and_feed_picks_up_post() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let (mut sync, mut feed_rx) = FeedSync::new(Arc::clone(&store));
    let mut composer = Composer::new(Arc::clone(&store));
    let mut inserts = sync.subscribe();

    sync.refresh().await;
    feed_rx.borrow_and_update();

    composer.set_body("Hello world");
    let id = composer.submit().await.unwrap().unwrap();

    // The notification arrives through the subscription, not from the
    // composer touching the synchronizer.
    let event = timeout(Duration::from_secs(1), inserts.next())
        .await
        .expect("notification should arrive")
        .unwrap();
    assert_eq!(event.id, id);

    sync.refresh().await;
    assert!(feed_rx.has_changed().unwrap());

    let feed = sync.displayed();
    assert_eq!(feed.len(), 1 + seed_posts().len());
    assert_eq!(feed[0].author, AUTHOR_NAME);
    assert_eq!(feed[0].body, "Hello world");
}

#[tokio::test]
async fn test_submit_with_image_resolves_local_url() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let (mut sync, _feed_rx) = FeedSync::new(Arc::clone(&store));
    let mut composer = Composer::new(Arc::clone(&store));

    composer.set_body("With a picture");
    composer.attach_image(Attachment {
        file_name: "sunset.jpg".to_string(),
        data: vec![0xff, 0xd8, 0xff],
    });
    composer.submit().await.unwrap().unwrap();

    sync.refresh().await;
    let feed = sync.displayed();
    let url = feed[0].photo_url.as_deref().expect("photo url resolved");
    assert!(url.starts_with("file://"));
    assert!(url.ends_with(".jpg"));

    // The blob really is on disk where the URL points.
    let path = url.strip_prefix("file://").unwrap();
    assert_eq!(std::fs::read(path).unwrap(), vec![0xff, 0xd8, 0xff]);
}

#[tokio::test]
async fn test_posts_survive_restart() {
    let dir = TempDir::new().unwrap();

    {
        let store = open_store(&dir);
        let mut composer = Composer::new(Arc::clone(&store));
        composer.set_body("First session");
        composer.submit().await.unwrap().unwrap();
    }

    // A new store over the same directory sees the post.
    let store = open_store(&dir);
    let (mut sync, _feed_rx) = FeedSync::new(store);
    sync.refresh().await;

    assert_eq!(sync.state(), SyncState::Populated);
    assert_eq!(sync.displayed()[0].body, "First session");
}

#[tokio::test]
async fn test_rendered_feed_lists_remote_then_seeds() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let (mut sync, _feed_rx) = FeedSync::new(Arc::clone(&store));
    let mut composer = Composer::new(Arc::clone(&store));

    composer.set_body("Newest post");
    composer.submit().await.unwrap().unwrap();

    sync.refresh().await;
    let rendered = render::feed(&sync.displayed());

    let newest = rendered.find("Newest post").unwrap();
    let seed = rendered.find("Alex Rivera").unwrap();
    assert!(newest < seed);
}
