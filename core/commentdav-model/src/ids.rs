//! Identifier type for stored comments.
//!
//! Ids are assigned by the store on first save and are strictly positive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use crate::CommentError;

/// Unique identifier of a persisted comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(NonZeroU64);

impl CommentId {
    /// Creates an id from a raw database value. Returns `None` for zero.
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommentId {
    type Err = CommentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the canonical decimal form names an id, so `+7` and `007`
        // are not aliases of `7`.
        s.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .filter(|id| id.to_string() == s)
            .ok_or_else(|| {
                CommentError::InvalidArgument(format!(
                    "IDs must be translatable to a number in this implementation: {s:?}"
                ))
            })
    }
}
