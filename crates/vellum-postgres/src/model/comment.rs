//! Comment model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::comments;
use crate::types::ReplyLevel;

/// Comment model representing reader discussions on posts.
///
/// A comment is either a root comment on a post (`reply_to` absent,
/// `reply_level` 0) or a reply attached to a root comment (`reply_to` set,
/// `reply_level` 1). Deeper nesting does not exist. Rows are never erased;
/// deletion sets `deleted_at` and normal reads skip such rows.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    /// Unique comment identifier.
    pub id: Uuid,
    /// Reference to the post this comment belongs to.
    pub post_id: Uuid,
    /// Reference to the account that authored this comment.
    pub author_id: Uuid,
    /// Root comment this reply is attached to (`None` for root comments).
    pub reply_to: Option<Uuid>,
    /// Nesting depth of this comment.
    pub reply_level: ReplyLevel,
    /// Comment body (rich text / HTML).
    pub content: String,
    /// Timestamp when the comment was created.
    pub created_at: Timestamp,
    /// Timestamp of the last edit (`None` until the first edit).
    pub updated_at: Option<Timestamp>,
    /// Timestamp when the comment was soft-deleted.
    pub deleted_at: Option<Timestamp>,
}

/// Data for creating a new comment.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewComment {
    /// Post ID.
    pub post_id: Uuid,
    /// Author account ID.
    pub author_id: Uuid,
    /// Root comment ID for replies.
    pub reply_to: Option<Uuid>,
    /// Nesting depth.
    pub reply_level: ReplyLevel,
    /// Comment content.
    pub content: String,
    /// Creation timestamp, supplied by the caller's time source.
    pub created_at: Timestamp,
}

/// Data for updating a comment.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateComment {
    /// Comment content.
    pub content: Option<String>,
    /// Edit timestamp, supplied by the caller's time source.
    pub updated_at: Option<Timestamp>,
}

impl Comment {
    /// Returns the creation timestamp.
    pub fn created_at(&self) -> jiff::Timestamp {
        self.created_at.into()
    }

    /// Returns the last edit timestamp, if the comment was ever edited.
    pub fn updated_at(&self) -> Option<jiff::Timestamp> {
        self.updated_at.map(Into::into)
    }

    /// Returns the deletion timestamp, if the comment is soft-deleted.
    pub fn deleted_at(&self) -> Option<jiff::Timestamp> {
        self.deleted_at.map(Into::into)
    }

    /// Returns whether this is a root comment (not a reply).
    pub fn is_root(&self) -> bool {
        self.reply_level.is_root()
    }

    /// Returns whether this is a reply to a root comment.
    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Returns whether this comment is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns whether this comment has been edited.
    pub fn is_edited(&self) -> bool {
        self.updated_at.is_some()
    }
}

impl NewComment {
    /// Creates a new root comment on a post.
    pub fn root(
        post_id: Uuid,
        author_id: Uuid,
        content: String,
        created_at: jiff::Timestamp,
    ) -> Self {
        Self {
            post_id,
            author_id,
            reply_to: None,
            reply_level: ReplyLevel::Root,
            content,
            created_at: created_at.into(),
        }
    }

    /// Creates a new reply attached to a root comment.
    pub fn reply(
        post_id: Uuid,
        author_id: Uuid,
        content: String,
        reply_to: Uuid,
        created_at: jiff::Timestamp,
    ) -> Self {
        Self {
            post_id,
            author_id,
            reply_to: Some(reply_to),
            reply_level: ReplyLevel::Reply,
            content,
            created_at: created_at.into(),
        }
    }
}

impl UpdateComment {
    /// Creates a content edit applied at the given timestamp.
    pub fn edit(content: String, edited_at: jiff::Timestamp) -> Self {
        Self {
            content: Some(content),
            updated_at: Some(edited_at.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_constructor_shape() {
        let now = jiff::Timestamp::now();
        let new_comment = NewComment::root(Uuid::new_v4(), Uuid::new_v4(), "hello".into(), now);

        assert_eq!(new_comment.reply_level, ReplyLevel::Root);
        assert_eq!(new_comment.reply_to, None);
        assert_eq!(jiff::Timestamp::from(new_comment.created_at), now);
    }

    #[test]
    fn reply_constructor_shape() {
        let now = jiff::Timestamp::now();
        let parent_id = Uuid::new_v4();
        let new_comment =
            NewComment::reply(Uuid::new_v4(), Uuid::new_v4(), "hi back".into(), parent_id, now);

        assert_eq!(new_comment.reply_level, ReplyLevel::Reply);
        assert_eq!(new_comment.reply_to, Some(parent_id));
    }

    #[test]
    fn predicates_follow_reply_target() {
        let now = jiff::Timestamp::now();
        let root = NewComment::root(Uuid::new_v4(), Uuid::new_v4(), "hello".into(), now);
        let reply =
            NewComment::reply(Uuid::new_v4(), Uuid::new_v4(), "hi".into(), Uuid::new_v4(), now);

        let as_comment = |new: NewComment| Comment {
            id: Uuid::new_v4(),
            post_id: new.post_id,
            author_id: new.author_id,
            reply_to: new.reply_to,
            reply_level: new.reply_level,
            content: new.content,
            created_at: new.created_at,
            updated_at: None,
            deleted_at: None,
        };

        let root = as_comment(root);
        assert!(root.is_root());
        assert!(!root.is_reply());
        assert!(!root.is_edited());
        assert!(!root.is_deleted());

        let reply = as_comment(reply);
        assert!(!reply.is_root());
        assert!(reply.is_reply());
    }

    #[test]
    fn edit_sets_both_fields() {
        let now = jiff::Timestamp::now();
        let updates = UpdateComment::edit("edited".into(), now);

        assert_eq!(updates.content.as_deref(), Some("edited"));
        assert_eq!(updates.updated_at.map(jiff::Timestamp::from), Some(now));
    }
}
