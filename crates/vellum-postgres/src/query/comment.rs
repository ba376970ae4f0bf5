//! Comment repository for managing threaded discussion operations.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use jiff::Timestamp;
use uuid::Uuid;

use crate::model::{Comment, NewComment, UpdateComment};
use crate::{PgClient, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Repository for comment database operations.
///
/// Handles comment lifecycle management: creation, threaded reads, edits,
/// and soft deletion. Every read excludes soft-deleted rows except
/// [`find_comment_with_deleted`], which exists for audit/history lookups.
///
/// List reads are ordered by `(created_at, id)` ascending; the id tie-break
/// keeps the order deterministic when timestamps collide.
///
/// The repository performs no business validation (nesting rules live in the
/// domain service that consumes it).
///
/// [`find_comment_with_deleted`]: CommentRepository::find_comment_with_deleted
pub trait CommentRepository {
    /// Creates a new comment.
    fn create_comment(
        &self,
        new_comment: NewComment,
    ) -> impl Future<Output = PgResult<Comment>> + Send;

    /// Finds a live comment by its unique identifier.
    fn find_comment_by_id(
        &self,
        comment_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<Comment>>> + Send;

    /// Finds a comment by its unique identifier, including soft-deleted rows.
    fn find_comment_with_deleted(
        &self,
        comment_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<Comment>>> + Send;

    /// Finds all live comments of a post, roots and replies alike.
    fn find_post_comments(
        &self,
        post_id: Uuid,
    ) -> impl Future<Output = PgResult<Vec<Comment>>> + Send;

    /// Finds all live replies attached to a comment.
    fn find_comment_replies(
        &self,
        parent_comment_id: Uuid,
    ) -> impl Future<Output = PgResult<Vec<Comment>>> + Send;

    /// Updates a live comment inside a transaction.
    ///
    /// The update and its commit are one atomic span; on any error the
    /// transaction is rolled back and the row is left untouched. A missing
    /// or soft-deleted comment surfaces as a `NotFound` query error.
    fn update_comment(
        &self,
        comment_id: Uuid,
        updates: UpdateComment,
    ) -> impl Future<Output = PgResult<Comment>> + Send;

    /// Soft deletes a live comment by setting the deletion timestamp.
    ///
    /// Returns `false` when no live comment matched the id. Replies of a
    /// deleted root are not touched.
    fn soft_delete_comment(
        &self,
        comment_id: Uuid,
        deleted_at: Timestamp,
    ) -> impl Future<Output = PgResult<bool>> + Send;
}

impl CommentRepository for PgClient {
    async fn create_comment(&self, new_comment: NewComment) -> PgResult<Comment> {
        let mut conn = self.get_connection().await?;

        use schema::comments;

        let comment = diesel::insert_into(comments::table)
            .values(&new_comment)
            .returning(Comment::as_returning())
            .get_result(&mut *conn)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            comment_id = %comment.id,
            post_id = %comment.post_id,
            reply_level = comment.reply_level.as_i16(),
            "Comment row inserted"
        );

        Ok(comment)
    }

    async fn find_comment_by_id(&self, comment_id: Uuid) -> PgResult<Option<Comment>> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comment = comments::table
            .filter(dsl::id.eq(comment_id))
            .filter(dsl::deleted_at.is_null())
            .select(Comment::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(comment)
    }

    async fn find_comment_with_deleted(&self, comment_id: Uuid) -> PgResult<Option<Comment>> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comment = comments::table
            .filter(dsl::id.eq(comment_id))
            .select(Comment::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(comment)
    }

    async fn find_post_comments(&self, post_id: Uuid) -> PgResult<Vec<Comment>> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comments = comments::table
            .filter(dsl::post_id.eq(post_id))
            .filter(dsl::deleted_at.is_null())
            .order((dsl::created_at.asc(), dsl::id.asc()))
            .select(Comment::as_select())
            .load(&mut *conn)
            .await
            .map_err(PgError::from)?;

        Ok(comments)
    }

    async fn find_comment_replies(&self, parent_comment_id: Uuid) -> PgResult<Vec<Comment>> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comments = comments::table
            .filter(dsl::reply_to.eq(parent_comment_id))
            .filter(dsl::deleted_at.is_null())
            .order((dsl::created_at.asc(), dsl::id.asc()))
            .select(Comment::as_select())
            .load(&mut *conn)
            .await
            .map_err(PgError::from)?;

        Ok(comments)
    }

    async fn update_comment(&self, comment_id: Uuid, updates: UpdateComment) -> PgResult<Comment> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comment = conn
            .transaction(|conn| {
                async move {
                    diesel::update(
                        comments::table
                            .filter(dsl::id.eq(comment_id))
                            .filter(dsl::deleted_at.is_null()),
                    )
                    .set(&updates)
                    .returning(Comment::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(PgError::from)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            comment_id = %comment.id,
            "Comment row updated"
        );

        Ok(comment)
    }

    async fn soft_delete_comment(&self, comment_id: Uuid, deleted_at: Timestamp) -> PgResult<bool> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let affected = diesel::update(
            comments::table
                .filter(dsl::id.eq(comment_id))
                .filter(dsl::deleted_at.is_null()),
        )
        .set(dsl::deleted_at.eq(Some(jiff_diesel::Timestamp::from(deleted_at))))
        .execute(&mut *conn)
        .await
        .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            comment_id = %comment_id,
            deleted = affected > 0,
            "Comment row soft-deleted"
        );

        Ok(affected > 0)
    }
}
