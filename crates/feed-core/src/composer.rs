//! Post composer: draft state and the multi-step submission pipeline
//! (optional blob upload, public URL resolution, record insert).

use thiserror::Error;
use tracing::debug;

use crate::post::{MAX_BODY_CHARS, POSTS_COLLECTION};
use crate::store::{NewRecord, RemoteStore, StoreError};

/// Fixed identity every post is attributed to.
pub const AUTHOR_NAME: &str = "Danyael Dela Cruz";

/// Bucket holding uploaded post images.
pub const IMAGE_BUCKET: &str = "post-images";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("image upload failed: {0}")]
    Upload(StoreError),

    #[error("post creation failed: {0}")]
    Insert(StoreError),
}

/// A pending image attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Extension used for the storage key: the last `.`-separated segment of
    /// the file name (the whole name when there is no dot).
    fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or_default()
    }
}

/// Storage key for an attachment: `<random-fractional-token>.<extension>`.
fn storage_key(attachment: &Attachment) -> String {
    let token: f64 = rand::random();
    format!("{:.15}.{}", token, attachment.extension())
}

/// In-progress, unsaved post content. Reset only on submission success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    body: String,
    image: Option<Attachment>,
}

/// Owns the draft and drives the submission pipeline.
///
/// At most one submission is in flight per composer; [`Composer::submit`]
/// is a no-op while one is.
pub struct Composer<S> {
    store: S,
    draft: Draft,
    submitting: bool,
}

impl<S: RemoteStore> Composer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            draft: Draft::default(),
            submitting: false,
        }
    }

    /// Replace the draft body, truncating at the character cap.
    pub fn set_body(&mut self, text: &str) {
        self.draft.body = match text.char_indices().nth(MAX_BODY_CHARS) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.to_string(),
        };
    }

    pub fn body(&self) -> &str {
        &self.draft.body
    }

    /// Characters still available, shown next to the input. Informational
    /// only; the cap itself is enforced by [`Composer::set_body`].
    pub fn remaining(&self) -> usize {
        MAX_BODY_CHARS - self.draft.body.chars().count()
    }

    /// Attach an image, replacing any previous one.
    pub fn attach_image(&mut self, attachment: Attachment) {
        self.draft.image = Some(attachment);
    }

    pub fn clear_image(&mut self) {
        self.draft.image = None;
    }

    pub fn image(&self) -> Option<&Attachment> {
        self.draft.image.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether `submit` would currently run: a non-empty trimmed body and no
    /// submission already in flight.
    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.draft.body.trim().is_empty()
    }

    /// Run the submission pipeline.
    ///
    /// Returns `Ok(None)` without side effects when [`Composer::can_submit`]
    /// is false. On success the draft is reset and the new record id is
    /// returned; on failure the draft is left untouched for a retry.
    pub async fn submit(&mut self) -> Result<Option<i64>, SubmitError> {
        if !self.can_submit() {
            debug!("Submit ignored: empty draft or submission in flight");
            return Ok(None);
        }

        self.submitting = true;
        let outcome = self.run_pipeline().await;
        // The in-flight flag never survives the pipeline, error or not.
        self.submitting = false;

        match outcome {
            Ok(id) => {
                self.draft = Draft::default();
                Ok(Some(id))
            }
            Err(e) => Err(e),
        }
    }

    /// Upload the attachment (if any), resolve its public URL, then insert
    /// the record. Aborts on the first failure.
    async fn run_pipeline(&self) -> Result<i64, SubmitError> {
        let photo_url = match &self.draft.image {
            Some(attachment) => {
                let key = storage_key(attachment);
                self.store
                    .upload_blob(IMAGE_BUCKET, &key, attachment.data.clone())
                    .await
                    .map_err(SubmitError::Upload)?;
                Some(self.store.resolve_public_url(IMAGE_BUCKET, &key))
            }
            None => None,
        };

        let record = NewRecord {
            name: AUTHOR_NAME.to_string(),
            body: self.draft.body.trim().to_string(),
            photo_url,
        };

        self.store
            .insert(POSTS_COLLECTION, record)
            .await
            .map_err(SubmitError::Insert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn attachment(name: &str) -> Attachment {
        Attachment {
            file_name: name.to_string(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    #[test]
    fn test_storage_key_keeps_extension() {
        let key = storage_key(&attachment("vacation.jpg"));
        assert!(key.starts_with("0."));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_storage_key_extensionless_name() {
        // Mirrors taking the last dot-separated segment of the name.
        let key = storage_key(&attachment("photo"));
        assert!(key.ends_with(".photo"));
    }

    #[test]
    fn test_set_body_truncates_at_cap() {
        let mut composer = Composer::new(MemoryStore::new());
        composer.set_body(&"x".repeat(300));
        assert_eq!(composer.body().chars().count(), MAX_BODY_CHARS);
        assert_eq!(composer.remaining(), 0);
    }

    #[test]
    fn test_set_body_truncation_is_unicode_safe() {
        let mut composer = Composer::new(MemoryStore::new());
        composer.set_body(&"é".repeat(300));
        assert_eq!(composer.body().chars().count(), MAX_BODY_CHARS);
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut composer = Composer::new(MemoryStore::new());
        composer.set_body("Hello");
        assert_eq!(composer.remaining(), MAX_BODY_CHARS - 5);
    }

    #[test]
    fn test_can_submit_requires_nonblank_body() {
        let mut composer = Composer::new(MemoryStore::new());
        assert!(!composer.can_submit());

        composer.set_body("   ");
        assert!(!composer.can_submit());

        composer.set_body("  Hello world  ");
        assert!(composer.can_submit());
    }

    #[tokio::test]
    async fn test_submit_without_image_inserts_trimmed_record() {
        let store = Arc::new(MemoryStore::new());
        let mut composer = Composer::new(Arc::clone(&store));

        composer.set_body("  Hello world  ");
        let id = composer.submit().await.unwrap().unwrap();

        let records = store.records(POSTS_COLLECTION);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].name.as_deref(), Some(AUTHOR_NAME));
        assert_eq!(records[0].body.as_deref(), Some("Hello world"));
        assert_eq!(records[0].photo_url, None);

        // Draft cleared on success.
        assert_eq!(composer.body(), "");
        assert!(composer.image().is_none());
        assert!(!composer.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_with_empty_body_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let mut composer = Composer::new(Arc::clone(&store));

        composer.set_body("   ");
        assert_eq!(composer.submit().await.unwrap(), None);
        assert!(store.records(POSTS_COLLECTION).is_empty());
    }

    #[tokio::test]
    async fn test_submit_with_image_uploads_then_inserts() {
        let store = Arc::new(MemoryStore::new());
        let mut composer = Composer::new(Arc::clone(&store));

        composer.set_body("Look at this");
        composer.attach_image(attachment("sunset.png"));
        composer.submit().await.unwrap().unwrap();

        let keys = store.blob_keys(IMAGE_BUCKET);
        assert_eq!(keys.len(), 1);
        assert!(keys[0].ends_with(".png"));

        let records = store.records(POSTS_COLLECTION);
        let url = records[0].photo_url.as_deref().unwrap();
        assert_eq!(url, store.resolve_public_url(IMAGE_BUCKET, &keys[0]));

        // Draft fully cleared, image included.
        assert!(composer.image().is_none());
        assert_eq!(composer.body(), "");
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_before_insert() {
        let store = Arc::new(MemoryStore::new());
        store.fail_uploads(true);
        let mut composer = Composer::new(Arc::clone(&store));

        composer.set_body("Look at this");
        composer.attach_image(attachment("sunset.png"));
        let err = composer.submit().await.unwrap_err();

        assert!(matches!(err, SubmitError::Upload(_)));
        // Nothing was inserted and the draft survives for a retry.
        assert!(store.records(POSTS_COLLECTION).is_empty());
        assert_eq!(composer.body(), "Look at this");
        assert!(composer.image().is_some());
        assert!(!composer.is_submitting());
    }

    #[tokio::test]
    async fn test_insert_failure_retains_full_draft() {
        let store = Arc::new(MemoryStore::new());
        store.fail_inserts(true);
        let mut composer = Composer::new(Arc::clone(&store));

        composer.set_body("Hello");
        composer.attach_image(attachment("pic.jpg"));
        let err = composer.submit().await.unwrap_err();

        assert!(matches!(err, SubmitError::Insert(_)));
        assert_eq!(composer.body(), "Hello");
        assert!(composer.image().is_some());
        assert!(!composer.is_submitting());

        // A user-initiated retry succeeds once the store recovers.
        store.fail_inserts(false);
        composer.submit().await.unwrap().unwrap();
        assert_eq!(store.records(POSTS_COLLECTION).len(), 1);
        assert_eq!(composer.body(), "");
    }

    #[tokio::test]
    async fn test_attach_image_replaces_previous() {
        let mut composer = Composer::new(MemoryStore::new());
        composer.attach_image(attachment("first.png"));
        composer.attach_image(attachment("second.png"));
        assert_eq!(composer.image().unwrap().file_name, "second.png");

        composer.clear_image();
        assert!(composer.image().is_none());
    }
}
