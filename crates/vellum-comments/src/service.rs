//! Comment domain service: nesting rules, tree reads, and mutations.

use std::collections::HashMap;

use uuid::Uuid;
use vellum_postgres::model::{Comment, NewComment, UpdateComment};
use vellum_postgres::query::CommentRepository;

use crate::clock::Clock;
use crate::error::{Error, Result};

/// Tracing target for comment service operations.
const TRACING_TARGET: &str = "vellum_comments::service";

// Operation paths carried by errors, so a failure reported by the boundary
// layer can be traced back to the exact service entry point.
const OP_WRITE_COMMENT: &str = "comments.write_comment";
const OP_WRITE_REPLY: &str = "comments.write_reply";
const OP_LIST_ROOT_COMMENTS: &str = "comments.list_root_comments";
const OP_LIST_REPLIES: &str = "comments.list_replies";
const OP_EDIT_COMMENT: &str = "comments.edit_comment";
const OP_DELETE_COMMENT: &str = "comments.delete_comment";

/// A root comment with its live replies attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    /// The top-level comment.
    pub root: Comment,
    /// Live replies to the root, in `(created_at, id)` order.
    pub replies: Vec<Comment>,
}

/// Domain service for threaded comments on posts.
///
/// Enforces the two-level nesting cap, shapes reply trees, and translates
/// persistence failures into the typed kinds in [`crate::ErrorKind`]. The
/// service is stateless per call; concurrent callers share only the
/// underlying repository.
///
/// Both collaborators are passed in explicitly: the repository carrying the
/// relational store and the clock supplying canonical timestamps.
#[derive(Debug, Clone)]
pub struct CommentService<R, C> {
    repository: R,
    clock: C,
}

impl<R, C> CommentService<R, C>
where
    R: CommentRepository,
    C: Clock,
{
    /// Creates a new comment service over the given repository and clock.
    pub fn new(repository: R, clock: C) -> Self {
        Self { repository, clock }
    }

    /// Writes a new top-level comment on a post.
    ///
    /// # Errors
    ///
    /// Returns [`WriteFailed`] when persistence fails; the low-level cause
    /// is wrapped, never dropped.
    ///
    /// [`WriteFailed`]: crate::ErrorKind::WriteFailed
    #[tracing::instrument(skip_all, fields(author_id = %author_id, post_id = %post_id))]
    pub async fn write_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        content: String,
    ) -> Result<Comment> {
        tracing::debug!(target: TRACING_TARGET, "Writing root comment");

        let new_comment = NewComment::root(post_id, author_id, content, self.clock.now());
        let comment = self
            .repository
            .create_comment(new_comment)
            .await
            .map_err(|e| Error::write_failed(OP_WRITE_COMMENT).with_source(e))?;

        tracing::info!(
            target: TRACING_TARGET,
            comment_id = %comment.id,
            "Root comment written",
        );

        Ok(comment)
    }

    /// Writes a reply to an existing root comment.
    ///
    /// The parent is fetched first and validated: it must resolve to a live
    /// comment, and it must itself be a root comment. The parent check and
    /// the insert are separate store round-trips; a parent deleted in
    /// between is tolerated, since deleting a root does not cascade and its
    /// replies stay readable.
    ///
    /// # Errors
    ///
    /// - [`ParentNotFound`] when the parent id does not resolve to a live comment
    /// - [`NestingTooDeep`] when the parent is itself a reply
    /// - [`WriteFailed`] when persistence fails at any step
    ///
    /// [`ParentNotFound`]: crate::ErrorKind::ParentNotFound
    /// [`NestingTooDeep`]: crate::ErrorKind::NestingTooDeep
    /// [`WriteFailed`]: crate::ErrorKind::WriteFailed
    #[tracing::instrument(skip_all, fields(
        author_id = %author_id,
        post_id = %post_id,
        parent_comment_id = %parent_comment_id,
    ))]
    pub async fn write_reply(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        content: String,
        parent_comment_id: Uuid,
    ) -> Result<Comment> {
        tracing::debug!(target: TRACING_TARGET, "Writing reply");

        let parent = self
            .repository
            .find_comment_by_id(parent_comment_id)
            .await
            .map_err(|e| Error::write_failed(OP_WRITE_REPLY).with_source(e))?
            .ok_or_else(|| Error::parent_not_found(OP_WRITE_REPLY))?;

        // The nesting cap: replies attach to root comments only.
        if !parent.reply_level.is_root() {
            tracing::debug!(
                target: TRACING_TARGET,
                parent_level = parent.reply_level.as_i16(),
                "Rejecting reply to a reply",
            );
            return Err(Error::nesting_too_deep(OP_WRITE_REPLY));
        }

        let new_comment = NewComment::reply(
            post_id,
            author_id,
            content,
            parent_comment_id,
            self.clock.now(),
        );
        let comment = self
            .repository
            .create_comment(new_comment)
            .await
            .map_err(|e| Error::write_failed(OP_WRITE_REPLY).with_source(e))?;

        tracing::info!(
            target: TRACING_TARGET,
            comment_id = %comment.id,
            "Reply written",
        );

        Ok(comment)
    }

    /// Returns all live root comments of a post with their replies attached.
    ///
    /// One tree-shaped read fetches every live comment of the post in
    /// `(created_at, id)` ascending order; replies are then grouped under
    /// their roots, preserving that order on both levels. Replies whose
    /// root was deleted do not appear in any thread (deletion does not
    /// cascade); they remain reachable through [`list_replies`].
    ///
    /// # Errors
    ///
    /// Returns [`ReadFailed`] when persistence fails.
    ///
    /// [`list_replies`]: CommentService::list_replies
    /// [`ReadFailed`]: crate::ErrorKind::ReadFailed
    #[tracing::instrument(skip_all, fields(post_id = %post_id))]
    pub async fn list_root_comments(&self, post_id: Uuid) -> Result<Vec<CommentThread>> {
        tracing::debug!(target: TRACING_TARGET, "Listing root comments");

        let comments = self
            .repository
            .find_post_comments(post_id)
            .await
            .map_err(|e| Error::read_failed(OP_LIST_ROOT_COMMENTS).with_source(e))?;

        let threads = build_threads(comments);

        tracing::debug!(
            target: TRACING_TARGET,
            thread_count = threads.len(),
            "Root comments listed",
        );

        Ok(threads)
    }

    /// Returns all live replies attached to a root comment.
    ///
    /// # Errors
    ///
    /// Returns [`ReadFailed`] when persistence fails.
    ///
    /// [`ReadFailed`]: crate::ErrorKind::ReadFailed
    #[tracing::instrument(skip_all, fields(root_comment_id = %root_comment_id))]
    pub async fn list_replies(&self, root_comment_id: Uuid) -> Result<Vec<Comment>> {
        tracing::debug!(target: TRACING_TARGET, "Listing replies");

        self.repository
            .find_comment_replies(root_comment_id)
            .await
            .map_err(|e| Error::read_failed(OP_LIST_REPLIES).with_source(e))
    }

    /// Edits the content of a live comment.
    ///
    /// Content and `updated_at` change together inside a repository
    /// transaction; on any failure mid-span the row is left untouched. The
    /// immutable fields (author, post, reply target, level, creation time)
    /// are never part of the change set.
    ///
    /// # Errors
    ///
    /// - [`CommentNotFound`] when the id does not resolve to a live comment
    /// - [`UpdateFailed`] when persistence fails
    ///
    /// [`CommentNotFound`]: crate::ErrorKind::CommentNotFound
    /// [`UpdateFailed`]: crate::ErrorKind::UpdateFailed
    #[tracing::instrument(skip_all, fields(comment_id = %comment_id))]
    pub async fn edit_comment(&self, comment_id: Uuid, new_content: String) -> Result<Comment> {
        tracing::debug!(target: TRACING_TARGET, "Editing comment");

        let updates = UpdateComment::edit(new_content, self.clock.now());
        let comment = self
            .repository
            .update_comment(comment_id, updates)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::comment_not_found(OP_EDIT_COMMENT)
                } else {
                    Error::update_failed(OP_EDIT_COMMENT).with_source(e)
                }
            })?;

        tracing::info!(target: TRACING_TARGET, "Comment edited");

        Ok(comment)
    }

    /// Soft-deletes a live comment.
    ///
    /// Sets `deleted_at` and nothing else; the row stays in storage for
    /// audit and history. Deleting a root comment does not cascade to its
    /// replies.
    ///
    /// # Errors
    ///
    /// - [`CommentNotFound`] when the id does not resolve to a live comment
    /// - [`DeleteFailed`] when persistence fails
    ///
    /// [`CommentNotFound`]: crate::ErrorKind::CommentNotFound
    /// [`DeleteFailed`]: crate::ErrorKind::DeleteFailed
    #[tracing::instrument(skip_all, fields(comment_id = %comment_id))]
    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        tracing::debug!(target: TRACING_TARGET, "Deleting comment");

        let deleted = self
            .repository
            .soft_delete_comment(comment_id, self.clock.now())
            .await
            .map_err(|e| Error::delete_failed(OP_DELETE_COMMENT).with_source(e))?;

        if !deleted {
            return Err(Error::comment_not_found(OP_DELETE_COMMENT));
        }

        tracing::info!(target: TRACING_TARGET, "Comment deleted");

        Ok(())
    }
}

/// Groups a post's live comments into reply trees.
///
/// The input is expected in `(created_at, id)` ascending order; the order is
/// preserved for roots and within each root's replies.
fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let (roots, replies): (Vec<_>, Vec<_>) =
        comments.into_iter().partition(|comment| comment.is_root());

    let mut threads: Vec<CommentThread> = roots
        .into_iter()
        .map(|root| CommentThread {
            root,
            replies: Vec::new(),
        })
        .collect();

    let index: HashMap<Uuid, usize> = threads
        .iter()
        .enumerate()
        .map(|(position, thread)| (thread.root.id, position))
        .collect();

    for reply in replies {
        let Some(parent_id) = reply.reply_to else {
            continue;
        };
        if let Some(&position) = index.get(&parent_id) {
            threads[position].replies.push(reply);
        }
        // A reply without a live root (the root was deleted) stays out of
        // the tree; it is still reachable through list_replies.
    }

    threads
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};
    use vellum_postgres::types::ReplyLevel;

    use super::*;
    use crate::ErrorKind;
    use crate::mock::{ManualClock, MockCommentStore};

    fn service() -> (
        CommentService<MockCommentStore, ManualClock>,
        MockCommentStore,
        ManualClock,
    ) {
        let store = MockCommentStore::new();
        let clock = ManualClock::new(Timestamp::from_second(1_700_000_000).unwrap());
        let service = CommentService::new(store.clone(), clock.clone());
        (service, store, clock)
    }

    #[tokio::test]
    async fn write_comment_persists_root_shape() {
        let (service, _, clock) = service();
        let (author_id, post_id) = (Uuid::new_v4(), Uuid::new_v4());

        let comment = service
            .write_comment(author_id, post_id, "hello".into())
            .await
            .unwrap();

        assert_eq!(comment.author_id, author_id);
        assert_eq!(comment.post_id, post_id);
        assert_eq!(comment.reply_level, ReplyLevel::Root);
        assert_eq!(comment.reply_to, None);
        assert_eq!(comment.created_at(), clock.now());
        assert_eq!(comment.updated_at(), None);
        assert!(!comment.is_deleted());
    }

    #[tokio::test]
    async fn reply_chain_stops_at_two_levels() {
        let (service, _, _) = service();
        let post_id = Uuid::new_v4();

        let root = service
            .write_comment(Uuid::new_v4(), post_id, "hello".into())
            .await
            .unwrap();

        let reply = service
            .write_reply(Uuid::new_v4(), post_id, "hi back".into(), root.id)
            .await
            .unwrap();
        assert_eq!(reply.reply_level, ReplyLevel::Reply);
        assert_eq!(reply.reply_to, Some(root.id));

        // A reply to a reply violates the nesting cap.
        let nested = service
            .write_reply(Uuid::new_v4(), post_id, "nested".into(), reply.id)
            .await
            .unwrap_err();
        assert_eq!(nested.kind(), ErrorKind::NestingTooDeep);
        assert!(nested.is_validation());
    }

    #[tokio::test]
    async fn reply_parent_looked_up_post_hoc_is_root() {
        let (service, store, _) = service();
        let post_id = Uuid::new_v4();

        let root = service
            .write_comment(Uuid::new_v4(), post_id, "hello".into())
            .await
            .unwrap();
        let reply = service
            .write_reply(Uuid::new_v4(), post_id, "hi back".into(), root.id)
            .await
            .unwrap();

        let parent = store.get(reply.reply_to.unwrap()).unwrap();
        assert_eq!(parent.reply_level, ReplyLevel::Root);
    }

    #[tokio::test]
    async fn reply_to_unknown_parent_fails() {
        let (service, _, _) = service();

        let error = service
            .write_reply(Uuid::new_v4(), Uuid::new_v4(), "hi".into(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ParentNotFound);
    }

    #[tokio::test]
    async fn reply_to_deleted_parent_fails() {
        let (service, _, _) = service();
        let post_id = Uuid::new_v4();

        let root = service
            .write_comment(Uuid::new_v4(), post_id, "hello".into())
            .await
            .unwrap();
        service.delete_comment(root.id).await.unwrap();

        let error = service
            .write_reply(Uuid::new_v4(), post_id, "too late".into(), root.id)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ParentNotFound);
    }

    #[tokio::test]
    async fn list_root_comments_groups_replies_in_order() {
        let (service, _, clock) = service();
        let post_id = Uuid::new_v4();

        let first = service
            .write_comment(Uuid::new_v4(), post_id, "first".into())
            .await
            .unwrap();
        clock.advance(SignedDuration::from_secs(1));
        let second = service
            .write_comment(Uuid::new_v4(), post_id, "second".into())
            .await
            .unwrap();
        clock.advance(SignedDuration::from_secs(1));
        let reply_to_first = service
            .write_reply(Uuid::new_v4(), post_id, "re: first".into(), first.id)
            .await
            .unwrap();

        // A comment on an unrelated post stays out of the listing.
        service
            .write_comment(Uuid::new_v4(), Uuid::new_v4(), "elsewhere".into())
            .await
            .unwrap();

        let threads = service.list_root_comments(post_id).await.unwrap();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].root.id, first.id);
        assert_eq!(threads[0].replies, vec![reply_to_first]);
        assert_eq!(threads[1].root.id, second.id);
        assert!(threads[1].replies.is_empty());
    }

    #[tokio::test]
    async fn list_root_comments_is_idempotent() {
        let (service, _, clock) = service();
        let post_id = Uuid::new_v4();

        // Equal timestamps force the id tie-break to carry the ordering.
        for content in ["a", "b", "c"] {
            service
                .write_comment(Uuid::new_v4(), post_id, content.into())
                .await
                .unwrap();
        }
        clock.advance(SignedDuration::from_secs(1));

        let once = service.list_root_comments(post_id).await.unwrap();
        let twice = service.list_root_comments(post_id).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn deleted_root_leaves_replies_reachable() {
        let (service, store, clock) = service();
        let post_id = Uuid::new_v4();

        let root = service
            .write_comment(Uuid::new_v4(), post_id, "hello".into())
            .await
            .unwrap();
        let reply = service
            .write_reply(Uuid::new_v4(), post_id, "hi back".into(), root.id)
            .await
            .unwrap();

        service.delete_comment(root.id).await.unwrap();

        // The deleted root is out of every normal read path...
        let threads = service.list_root_comments(post_id).await.unwrap();
        assert!(threads.iter().all(|thread| thread.root.id != root.id));

        // ...but stays in storage with its deletion timestamp for audit.
        let stored = store.get(root.id).unwrap();
        assert!(stored.is_deleted());
        assert_eq!(stored.deleted_at(), Some(clock.now()));

        // Deletion does not cascade: the reply is untouched and listable.
        let replies = service.list_replies(root.id).await.unwrap();
        assert_eq!(replies, vec![reply]);
    }

    #[tokio::test]
    async fn edit_updates_content_and_timestamp_only() {
        let (service, _, clock) = service();
        let (author_id, post_id) = (Uuid::new_v4(), Uuid::new_v4());

        let original = service
            .write_comment(author_id, post_id, "tpyo".into())
            .await
            .unwrap();

        clock.advance(SignedDuration::from_secs(30));
        let edited = service
            .edit_comment(original.id, "edited text".into())
            .await
            .unwrap();

        assert_eq!(edited.content, "edited text");
        assert_eq!(edited.updated_at(), Some(clock.now()));
        assert!(edited.updated_at().unwrap() >= edited.created_at());
        assert!(edited.is_edited());

        // Immutable fields survive the edit.
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.author_id, original.author_id);
        assert_eq!(edited.post_id, original.post_id);
        assert_eq!(edited.reply_to, original.reply_to);
        assert_eq!(edited.reply_level, original.reply_level);
        assert_eq!(edited.created_at(), original.created_at());
    }

    #[tokio::test]
    async fn edit_missing_or_deleted_comment_fails() {
        let (service, _, _) = service();

        let missing = service
            .edit_comment(Uuid::new_v4(), "ghost".into())
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::CommentNotFound);

        let comment = service
            .write_comment(Uuid::new_v4(), Uuid::new_v4(), "hello".into())
            .await
            .unwrap();
        service.delete_comment(comment.id).await.unwrap();

        let deleted = service
            .edit_comment(comment.id, "necromancy".into())
            .await
            .unwrap_err();
        assert_eq!(deleted.kind(), ErrorKind::CommentNotFound);
    }

    #[tokio::test]
    async fn edit_fault_mid_transaction_changes_nothing() {
        let (service, store, clock) = service();

        let comment = service
            .write_comment(Uuid::new_v4(), Uuid::new_v4(), "stable".into())
            .await
            .unwrap();

        clock.advance(SignedDuration::from_secs(5));
        store.fail_next("connection lost before commit");
        let error = service
            .edit_comment(comment.id, "lost edit".into())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UpdateFailed);

        // The rolled-back edit is not observable.
        let stored = store.get(comment.id).unwrap();
        assert_eq!(stored.content, "stable");
        assert_eq!(stored.updated_at(), None);
    }

    #[tokio::test]
    async fn delete_missing_comment_fails() {
        let (service, _, _) = service();

        let error = service.delete_comment(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::CommentNotFound);
    }

    #[tokio::test]
    async fn delete_is_not_repeatable() {
        let (service, _, _) = service();

        let comment = service
            .write_comment(Uuid::new_v4(), Uuid::new_v4(), "once".into())
            .await
            .unwrap();

        service.delete_comment(comment.id).await.unwrap();
        let second = service.delete_comment(comment.id).await.unwrap_err();
        assert_eq!(second.kind(), ErrorKind::CommentNotFound);
    }

    #[tokio::test]
    async fn persistence_failures_wrap_their_cause() {
        let (service, store, _) = service();

        store.fail_next("disk on fire");
        let error = service
            .write_comment(Uuid::new_v4(), Uuid::new_v4(), "hello".into())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::WriteFailed);
        assert!(error.is_infrastructure());
        assert!(error.cause().starts_with("comments.write_comment."));
        assert!(error.cause().contains("disk on fire"));

        store.fail_next("reader unplugged");
        let error = service.list_root_comments(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ReadFailed);
        assert!(error.cause().contains("reader unplugged"));
    }
}
