//! Nesting depth of a comment, persisted as a `SMALLINT` column.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::SmallInt;
use serde::{Deserialize, Serialize};

/// Nesting depth of a comment.
///
/// Comment threads are capped at two levels: a root comment on a post, and
/// replies attached to that root. The depth is stored as a plain integer
/// (`0` or `1`), but any other stored value fails to deserialize, so code
/// holding a `ReplyLevel` never sees a deeper level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsExpression, FromSqlRow)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ReplyLevel {
    /// A top-level comment on a post.
    Root = 0,
    /// A reply attached to a root comment.
    Reply = 1,
}

impl ReplyLevel {
    /// Returns the persisted integer representation of this level.
    #[inline]
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// Returns whether this is the top-level depth.
    #[inline]
    pub fn is_root(self) -> bool {
        matches!(self, ReplyLevel::Root)
    }
}

impl TryFrom<i16> for ReplyLevel {
    type Error = InvalidReplyLevel;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReplyLevel::Root),
            1 => Ok(ReplyLevel::Reply),
            other => Err(InvalidReplyLevel(other)),
        }
    }
}

/// A stored reply level outside the `{0, 1}` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid reply level: {0} (expected 0 or 1)")]
pub struct InvalidReplyLevel(pub i16);

impl FromSql<SmallInt, Pg> for ReplyLevel {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let level = <i16 as FromSql<SmallInt, Pg>>::from_sql(value)?;
        Ok(Self::try_from(level)?)
    }
}

impl ToSql<SmallInt, Pg> for ReplyLevel {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match self {
            ReplyLevel::Root => <i16 as ToSql<SmallInt, Pg>>::to_sql(&0, &mut out.reborrow()),
            ReplyLevel::Reply => <i16 as ToSql<SmallInt, Pg>>::to_sql(&1, &mut out.reborrow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trip() {
        assert_eq!(ReplyLevel::try_from(0), Ok(ReplyLevel::Root));
        assert_eq!(ReplyLevel::try_from(1), Ok(ReplyLevel::Reply));
        assert_eq!(ReplyLevel::Root.as_i16(), 0);
        assert_eq!(ReplyLevel::Reply.as_i16(), 1);
    }

    #[test]
    fn rejects_out_of_range_levels() {
        assert_eq!(ReplyLevel::try_from(2), Err(InvalidReplyLevel(2)));
        assert_eq!(ReplyLevel::try_from(-1), Err(InvalidReplyLevel(-1)));
    }

    #[test]
    fn root_predicate() {
        assert!(ReplyLevel::Root.is_root());
        assert!(!ReplyLevel::Reply.is_root());
    }
}
