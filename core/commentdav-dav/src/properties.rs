//! Property names and value formatting.
//!
//! Names use Clark notation (`{namespace}local`). Values are strings; `None`
//! marks a property that exists on the resource type but has no value, which
//! a multistatus reports under `404`.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;

use crate::{DavError, DavResult};

pub const NS_DAV: &str = "DAV:";
pub const NS_OWNCLOUD: &str = "http://owncloud.org/ns";
pub const NS_SABRE: &str = "http://sabredav.org/ns";

pub const PROP_ID: &str = "{http://owncloud.org/ns}id";
pub const PROP_PARENT_ID: &str = "{http://owncloud.org/ns}parentId";
pub const PROP_TOPMOST_PARENT_ID: &str = "{http://owncloud.org/ns}topmostParentId";
pub const PROP_CHILDREN_COUNT: &str = "{http://owncloud.org/ns}childrenCount";
pub const PROP_MESSAGE: &str = "{http://owncloud.org/ns}message";
pub const PROP_VERB: &str = "{http://owncloud.org/ns}verb";
pub const PROP_ACTOR_TYPE: &str = "{http://owncloud.org/ns}actorType";
pub const PROP_ACTOR_ID: &str = "{http://owncloud.org/ns}actorId";
pub const PROP_ACTOR_DISPLAY_NAME: &str = "{http://owncloud.org/ns}actorDisplayName";
pub const PROP_CREATION_DATETIME: &str = "{http://owncloud.org/ns}creationDateTime";
pub const PROP_LATEST_CHILD_DATETIME: &str = "{http://owncloud.org/ns}latestChildDateTime";
pub const PROP_OBJECT_TYPE: &str = "{http://owncloud.org/ns}objectType";
pub const PROP_OBJECT_ID: &str = "{http://owncloud.org/ns}objectId";
pub const PROP_IS_UNREAD: &str = "{http://owncloud.org/ns}isUnread";
pub const PROP_READ_MARKER: &str = "{http://owncloud.org/ns}readMarker";

/// Every property a comment exposes.
pub const COMMENT_PROPERTIES: [&str; 14] = [
    PROP_ID,
    PROP_PARENT_ID,
    PROP_TOPMOST_PARENT_ID,
    PROP_CHILDREN_COUNT,
    PROP_MESSAGE,
    PROP_VERB,
    PROP_ACTOR_TYPE,
    PROP_ACTOR_ID,
    PROP_ACTOR_DISPLAY_NAME,
    PROP_CREATION_DATETIME,
    PROP_LATEST_CHILD_DATETIME,
    PROP_OBJECT_TYPE,
    PROP_OBJECT_ID,
    PROP_IS_UNREAD,
];

/// Property name to value; `None` means "known but unset".
pub type PropertyMap = BTreeMap<String, Option<String>>;

/// Splits a Clark name into `(namespace, local)`. Names without a namespace
/// get an empty one.
pub fn split_clark(name: &str) -> (&str, &str) {
    name.strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .unwrap_or(("", name))
}

/// Keeps only `requested` entries of `all`, reporting unknown names as unset.
/// An empty request selects everything.
pub(crate) fn select(mut all: PropertyMap, requested: &[&str]) -> PropertyMap {
    if requested.is_empty() {
        return all;
    }
    requested
        .iter()
        .map(|name| (name.to_string(), all.remove(*name).flatten()))
        .collect()
}

/// Formats a timestamp for a property value (RFC 2822).
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.to_rfc2822()
}

/// Parses a client-supplied date-time.
///
/// Accepts RFC 3339, RFC 2822, and `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_datetime(raw: &str) -> DavResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_rfc2822(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(DavError::BadRequest(format!("Invalid date time \"{raw}\"")))
}
