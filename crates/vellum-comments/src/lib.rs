#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod clock;
mod error;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use clock::{Clock, SystemClock};
pub use error::{BoxedError, Error, ErrorKind, Result};
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use mock::{ManualClock, MockCommentStore};
pub use service::{CommentService, CommentThread};

// The persisted record types flow through the service unchanged; re-export
// them so transport layers do not need a direct vellum-postgres dependency.
pub use vellum_postgres::model::Comment;
pub use vellum_postgres::types::ReplyLevel;
