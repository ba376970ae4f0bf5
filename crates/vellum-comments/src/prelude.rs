//! Prelude module for vellum-comments.
//!
//! This module re-exports the most commonly used types and traits from
//! vellum-comments, making it easy to import everything you need with a
//! single `use` statement.
//!
//! # Example
//!
//! ```rust,ignore
//! use vellum_comments::prelude::*;
//!
//! let service = CommentService::new(pg_client, SystemClock);
//! ```

pub use crate::clock::{Clock, SystemClock};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::service::{CommentService, CommentThread};
// Persisted record types and the repository contract
pub use vellum_postgres::model::Comment;
pub use vellum_postgres::query::CommentRepository;
pub use vellum_postgres::types::ReplyLevel;
