//! Common error type definitions for comment operations.

use std::borrow::Cow;

use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// This type is used as the source error in [`Error`], wrapping whatever
/// low-level failure the persistence layer produced while maintaining Send
/// and Sync bounds for multi-threaded contexts.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of failure kinds surfaced by the comment service.
///
/// Transport layers map these to response codes; the set never grows
/// per-operation, so matches on it stay exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Persisting a new comment failed.
    WriteFailed,
    /// The reply target is itself a reply; threads are two levels deep.
    NestingTooDeep,
    /// The reply target does not resolve to a live comment.
    ParentNotFound,
    /// Reading comments failed.
    ReadFailed,
    /// Editing a comment failed.
    UpdateFailed,
    /// Deleting a comment failed.
    DeleteFailed,
    /// The addressed comment does not resolve to a live comment.
    CommentNotFound,
}

impl ErrorKind {
    /// Returns true if this kind reports a violated precondition rather
    /// than an infrastructure failure.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            ErrorKind::NestingTooDeep | ErrorKind::ParentNotFound | ErrorKind::CommentNotFound
        )
    }

    /// Returns true if this kind reports a persistence-layer failure.
    pub fn is_infrastructure(self) -> bool {
        !self.is_validation()
    }
}

/// A structured error type for comment service operations.
///
/// Carries the failure kind, the operation path it was raised from, and the
/// wrapped low-level cause (if any). The cause is kept for diagnostics and
/// never dropped; redacting it from user-visible output is the transport
/// layer's job.
#[derive(Debug, Error)]
#[error("{operation}: {kind:?}")]
#[must_use = "service errors should be handled appropriately"]
pub struct Error {
    /// The kind of error that occurred.
    kind: ErrorKind,
    /// Dotted path of the operation that failed (e.g. `comments.write_reply`).
    operation: Cow<'static, str>,
    /// Wrapped low-level cause, if any.
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind and operation path.
    pub fn new(kind: ErrorKind, operation: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            operation: operation.into(),
            source: None,
        }
    }

    /// Adds a wrapped low-level cause to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new write failure.
    pub fn write_failed(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::WriteFailed, operation)
    }

    /// Creates a new nesting violation.
    pub fn nesting_too_deep(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NestingTooDeep, operation)
    }

    /// Creates a new missing-parent failure.
    pub fn parent_not_found(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ParentNotFound, operation)
    }

    /// Creates a new read failure.
    pub fn read_failed(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ReadFailed, operation)
    }

    /// Creates a new update failure.
    pub fn update_failed(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::UpdateFailed, operation)
    }

    /// Creates a new delete failure.
    pub fn delete_failed(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::DeleteFailed, operation)
    }

    /// Creates a new missing-comment failure.
    pub fn comment_not_found(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::CommentNotFound, operation)
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the operation path this error was raised from.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the traceable cause string for this error.
    ///
    /// Composed as `<operation-path>.<low-level-cause-or-"unknown">`, so a
    /// failure can be located in logs without exposing internals to end
    /// users.
    pub fn cause(&self) -> String {
        match &self.source {
            Some(source) => format!("{}.{}", self.operation, source),
            None => format!("{}.unknown", self.operation),
        }
    }

    /// Returns true if this is a validation error (violated precondition).
    pub fn is_validation(&self) -> bool {
        self.kind.is_validation()
    }

    /// Returns true if this is an infrastructure error (persistence failure).
    pub fn is_infrastructure(&self) -> bool {
        self.kind.is_infrastructure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(
            Error::write_failed("comments.write_comment").kind(),
            ErrorKind::WriteFailed
        );
        assert_eq!(
            Error::nesting_too_deep("comments.write_reply").kind(),
            ErrorKind::NestingTooDeep
        );
        assert_eq!(
            Error::comment_not_found("comments.edit_comment").kind(),
            ErrorKind::CommentNotFound
        );
    }

    #[test]
    fn cause_includes_wrapped_source() {
        let io_error = std::io::Error::other("connection reset");
        let error = Error::read_failed("comments.list_root_comments").with_source(io_error);

        assert_eq!(error.operation(), "comments.list_root_comments");
        assert_eq!(
            error.cause(),
            "comments.list_root_comments.connection reset"
        );
    }

    #[test]
    fn cause_defaults_to_unknown() {
        let error = Error::delete_failed("comments.delete_comment");
        assert_eq!(error.cause(), "comments.delete_comment.unknown");
    }

    #[test]
    fn classification_split() {
        assert!(Error::parent_not_found("comments.write_reply").is_validation());
        assert!(Error::nesting_too_deep("comments.write_reply").is_validation());
        assert!(Error::write_failed("comments.write_comment").is_infrastructure());
        assert!(Error::update_failed("comments.edit_comment").is_infrastructure());
    }
}
