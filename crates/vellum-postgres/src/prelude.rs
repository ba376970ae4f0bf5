//! Prelude module for vellum-postgres.
//!
//! This module re-exports the most commonly used types and traits from
//! vellum-postgres, making it easy to import everything you need with a
//! single `use` statement.
//!
//! # Example
//!
//! ```rust,no_run
//! use vellum_postgres::prelude::*;
//!
//! # fn example() -> PgResult<()> {
//! let config = PgConfig::new("postgresql://localhost/vellum");
//! let client = config.build()?;
//! # Ok(())
//! # }
//! ```

// Common query traits
pub use diesel::prelude::*;
pub use diesel_async::RunQueryDsl;

// Connection type
pub use crate::PgConnection;
pub use crate::client::{
    ConnectionPool, MigrationResult, MigrationStatus, PgClient, PgClientMigrationExt, PgConfig,
    PgConn, PgPoolStatus,
};
// Models and repositories
pub use crate::model::{Comment, NewComment, UpdateComment};
pub use crate::query::CommentRepository;
pub use crate::types::ReplyLevel;
// Error types
pub use crate::{PgError, PgResult};
