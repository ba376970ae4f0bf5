//! Mock implementations of the comment store and clock for testing.
//!
//! This module provides [`MockCommentStore`], an in-memory implementation of
//! [`CommentRepository`], and [`ManualClock`], a settable [`Clock`]. Both are
//! useful for unit testing the comment service without a Postgres instance.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! vellum-comments = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Fault injection
//!
//! [`MockCommentStore::fail_next`] arms a one-shot persistence fault: the
//! next repository call fails with the given message and leaves the stored
//! data untouched, mirroring a rolled-back transaction.

use std::sync::{Arc, Mutex};

use jiff::{SignedDuration, Timestamp};
use uuid::Uuid;
use vellum_postgres::error::DieselError;
use vellum_postgres::model::{Comment, NewComment, UpdateComment};
use vellum_postgres::query::CommentRepository;
use vellum_postgres::{PgError, PgResult};

use crate::clock::Clock;

/// In-memory comment store for testing.
///
/// Implements [`CommentRepository`] with the same visibility rules as the
/// Postgres implementation: reads exclude soft-deleted rows, the audit
/// lookup does not, and list reads are ordered by `(created_at, id)`.
#[derive(Clone, Debug, Default)]
pub struct MockCommentStore {
    inner: Arc<MockInner>,
}

#[derive(Debug, Default)]
struct MockInner {
    comments: Mutex<Vec<Comment>>,
    fail_next: Mutex<Option<String>>,
}

impl MockCommentStore {
    /// Creates a new, empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot fault: the next repository call fails with this
    /// message and changes nothing.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self
            .inner
            .fail_next
            .lock()
            .expect("mock store lock poisoned") = Some(message.into());
    }

    /// Returns a stored comment by id, including soft-deleted rows.
    pub fn get(&self, comment_id: Uuid) -> Option<Comment> {
        self.comments()
            .iter()
            .find(|comment| comment.id == comment_id)
            .cloned()
    }

    /// Returns the number of stored rows, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.comments().len()
    }

    /// Returns whether the store holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.comments().is_empty()
    }

    fn comments(&self) -> std::sync::MutexGuard<'_, Vec<Comment>> {
        self.inner
            .comments
            .lock()
            .expect("mock store lock poisoned")
    }

    fn take_fault(&self) -> PgResult<()> {
        let fault = self
            .inner
            .fail_next
            .lock()
            .expect("mock store lock poisoned")
            .take();

        match fault {
            Some(message) => Err(PgError::Unexpected(message.into())),
            None => Ok(()),
        }
    }
}

fn sorted(mut comments: Vec<Comment>) -> Vec<Comment> {
    comments.sort_by_key(|comment| (comment.created_at(), comment.id));
    comments
}

impl CommentRepository for MockCommentStore {
    async fn create_comment(&self, new_comment: NewComment) -> PgResult<Comment> {
        self.take_fault()?;

        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new_comment.post_id,
            author_id: new_comment.author_id,
            reply_to: new_comment.reply_to,
            reply_level: new_comment.reply_level,
            content: new_comment.content,
            created_at: new_comment.created_at,
            updated_at: None,
            deleted_at: None,
        };

        self.comments().push(comment.clone());
        Ok(comment)
    }

    async fn find_comment_by_id(&self, comment_id: Uuid) -> PgResult<Option<Comment>> {
        self.take_fault()?;

        Ok(self
            .comments()
            .iter()
            .find(|comment| comment.id == comment_id && !comment.is_deleted())
            .cloned())
    }

    async fn find_comment_with_deleted(&self, comment_id: Uuid) -> PgResult<Option<Comment>> {
        self.take_fault()?;
        Ok(self.get(comment_id))
    }

    async fn find_post_comments(&self, post_id: Uuid) -> PgResult<Vec<Comment>> {
        self.take_fault()?;

        Ok(sorted(
            self.comments()
                .iter()
                .filter(|comment| comment.post_id == post_id && !comment.is_deleted())
                .cloned()
                .collect(),
        ))
    }

    async fn find_comment_replies(&self, parent_comment_id: Uuid) -> PgResult<Vec<Comment>> {
        self.take_fault()?;

        Ok(sorted(
            self.comments()
                .iter()
                .filter(|comment| {
                    comment.reply_to == Some(parent_comment_id) && !comment.is_deleted()
                })
                .cloned()
                .collect(),
        ))
    }

    async fn update_comment(&self, comment_id: Uuid, updates: UpdateComment) -> PgResult<Comment> {
        // An armed fault fires between the update statement and its commit,
        // so nothing is applied.
        self.take_fault()?;

        let mut comments = self.comments();
        let comment = comments
            .iter_mut()
            .find(|comment| comment.id == comment_id && !comment.is_deleted())
            .ok_or(PgError::Query(DieselError::NotFound))?;

        if let Some(content) = updates.content {
            comment.content = content;
        }
        if let Some(updated_at) = updates.updated_at {
            comment.updated_at = Some(updated_at);
        }

        Ok(comment.clone())
    }

    async fn soft_delete_comment(&self, comment_id: Uuid, deleted_at: Timestamp) -> PgResult<bool> {
        self.take_fault()?;

        let mut comments = self.comments();
        let Some(comment) = comments
            .iter_mut()
            .find(|comment| comment.id == comment_id && !comment.is_deleted())
        else {
            return Ok(false);
        };

        comment.deleted_at = Some(deleted_at.into());
        Ok(true)
    }
}

/// A manually driven clock for testing.
///
/// Starts at a fixed timestamp and only moves when told to, so tests can
/// assert exact created/updated/deleted timestamps.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Creates a clock pinned at the given timestamp.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Pins the clock to the given timestamp.
    pub fn set(&self, now: Timestamp) {
        *self.now.lock().expect("mock clock lock poisoned") = now;
    }

    /// Moves the clock forward by the given duration.
    pub fn advance(&self, duration: SignedDuration) {
        let mut now = self.now.lock().expect("mock clock lock poisoned");
        *now += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().expect("mock clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let start = Timestamp::from_second(1_700_000_000).unwrap();
        let clock = ManualClock::new(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(SignedDuration::from_secs(42));
        assert_eq!(clock.now(), start + SignedDuration::from_secs(42));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[tokio::test]
    async fn mock_store_separates_live_and_deleted_reads() {
        let store = MockCommentStore::new();
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        assert!(store.is_empty());

        let comment = store
            .create_comment(NewComment::root(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "hello".into(),
                now,
            ))
            .await
            .unwrap();

        assert!(store.soft_delete_comment(comment.id, now).await.unwrap());

        assert_eq!(store.find_comment_by_id(comment.id).await.unwrap(), None);
        let stored = store
            .find_comment_with_deleted(comment.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_deleted());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn armed_fault_fires_once() {
        let store = MockCommentStore::new();
        store.fail_next("boom");

        let error = store.find_comment_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(error.to_string().contains("boom"));

        assert!(store.find_comment_by_id(Uuid::new_v4()).await.is_ok());
    }
}
