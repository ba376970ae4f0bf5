//! Database query repositories for the comments subsystem.
//!
//! This module contains repository traits that provide high-level database
//! operations over the comments table, encapsulating filtering and ordering
//! rules so call sites cannot accidentally observe soft-deleted rows.

mod comment;

pub use comment::CommentRepository;
