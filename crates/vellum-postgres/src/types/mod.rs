//! Contains constraints, enumerations and other custom types.

mod constraints;
mod reply_level;

pub use constraints::{CommentConstraints, ConstraintCategory, ConstraintViolation};
pub use reply_level::{InvalidReplyLevel, ReplyLevel};
