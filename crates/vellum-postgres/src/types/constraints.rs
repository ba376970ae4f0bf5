//! Database constraint violations organized by table.
//!
//! The comments table enforces its core invariants (nesting depth range,
//! root/reply consistency, timestamp ordering) at the database level; this
//! module maps the named constraints back to typed values so violations can
//! be classified instead of string-matched at call sites.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Comments table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum CommentConstraints {
    // Content validation constraints
    #[strum(serialize = "comments_content_not_empty")]
    ContentNotEmpty,

    // Nesting constraints
    #[strum(serialize = "comments_reply_level_range")]
    ReplyLevelRange,
    #[strum(serialize = "comments_reply_consistency")]
    ReplyConsistency,
    #[strum(serialize = "comments_reply_to_fkey")]
    ReplyToParent,

    // Chronological constraints
    #[strum(serialize = "comments_updated_after_created")]
    UpdatedAfterCreated,
    #[strum(serialize = "comments_deleted_after_created")]
    DeletedAfterCreated,

    // Identity constraints
    #[strum(serialize = "comments_pkey")]
    PrimaryKey,
}

impl CommentConstraints {
    /// Creates a new [`CommentConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            CommentConstraints::ContentNotEmpty | CommentConstraints::ReplyLevelRange => {
                ConstraintCategory::Validation
            }

            CommentConstraints::ReplyConsistency | CommentConstraints::ReplyToParent => {
                ConstraintCategory::BusinessLogic
            }

            CommentConstraints::UpdatedAfterCreated | CommentConstraints::DeletedAfterCreated => {
                ConstraintCategory::Chronological
            }

            CommentConstraints::PrimaryKey => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<CommentConstraints> for String {
    #[inline]
    fn from(val: CommentConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for CommentConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Categories of database constraint violations.
///
/// This enum helps classify constraint violations by their purpose and type,
/// making it easier to handle different categories of errors appropriately.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintCategory {
    /// Data validation constraints (format, length, range checks).
    Validation,
    /// Chronological integrity constraints (timestamp relationships).
    Chronological,
    /// Business logic constraints (domain-specific rules).
    BusinessLogic,
    /// Uniqueness constraints (primary keys, unique indexes).
    Uniqueness,
}

/// Unified constraint violation enum that can represent any database constraint.
///
/// This enum wraps all table-specific constraint types, providing a single
/// interface for handling any constraint violation while keeping the
/// per-table enumerations separate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConstraintViolation {
    /// Comments table constraints.
    Comment(CommentConstraints),
}

impl ConstraintViolation {
    /// Creates a new [`ConstraintViolation`] from the constraint name.
    ///
    /// Returns `None` if the constraint name is not recognized.
    pub fn new(constraint: &str) -> Option<Self> {
        CommentConstraints::new(constraint).map(Self::Comment)
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            ConstraintViolation::Comment(constraint) => constraint.categorize(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::Comment(constraint) => fmt::Display::fmt(constraint, f),
        }
    }
}

impl From<ConstraintViolation> for String {
    #[inline]
    fn from(val: ConstraintViolation) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for ConstraintViolation {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        ConstraintViolation::new(&value).ok_or(strum::ParseError::VariantNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_constraint_names() {
        assert_eq!(
            ConstraintViolation::new("comments_reply_consistency"),
            Some(ConstraintViolation::Comment(
                CommentConstraints::ReplyConsistency
            ))
        );
        assert_eq!(ConstraintViolation::new("unrelated_table_check"), None);
    }

    #[test]
    fn categorizes_constraints() {
        assert_eq!(
            CommentConstraints::ContentNotEmpty.categorize(),
            ConstraintCategory::Validation
        );
        assert_eq!(
            CommentConstraints::ReplyToParent.categorize(),
            ConstraintCategory::BusinessLogic
        );
        assert_eq!(
            CommentConstraints::DeletedAfterCreated.categorize(),
            ConstraintCategory::Chronological
        );
    }

    #[test]
    fn constraint_names_round_trip() {
        let name = CommentConstraints::ReplyLevelRange.to_string();
        assert_eq!(name, "comments_reply_level_range");
        assert_eq!(CommentConstraints::new(&name), Some(CommentConstraints::ReplyLevelRange));
    }
}
