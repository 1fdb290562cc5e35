//! Comment authorship.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of identity that authored a comment.
///
/// Only [`ActorType::Users`] is ever authorized to mutate comments through
/// the DAV layer; the other variants exist so stored comments from other
/// sources round-trip without losing their actor type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActorType {
    Users,
    Guests,
    Bots,
    DeletedUsers,
    Other(String),
}

impl ActorType {
    /// Returns the wire form used in storage and DAV properties.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Users => "users",
            Self::Guests => "guests",
            Self::Bots => "bots",
            Self::DeletedUsers => "deleted_users",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for ActorType {
    fn from(raw: &str) -> Self {
        match raw {
            "users" => Self::Users,
            "guests" => Self::Guests,
            "bots" => Self::Bots,
            "deleted_users" => Self::DeletedUsers,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ActorType {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<ActorType> for String {
    fn from(actor_type: ActorType) -> Self {
        actor_type.as_str().to_string()
    }
}

impl FromStr for ActorType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a comment is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub actor_type: ActorType,
    pub id: String,
}

impl Actor {
    pub fn new(actor_type: ActorType, id: impl Into<String>) -> Self {
        Self {
            actor_type,
            id: id.into(),
        }
    }

    /// Shorthand for a `users` actor.
    pub fn user(uid: impl Into<String>) -> Self {
        Self::new(ActorType::Users, uid)
    }
}
