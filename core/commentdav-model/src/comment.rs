use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Actor, CommentError, CommentId, CommentResult};

/// Maximum number of characters a comment message may hold.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Parent id used by comments that start a thread.
pub const ROOT_PARENT_ID: &str = "0";

/// The concrete object a comment is attached to, e.g. `files` / `42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

/// A single comment.
///
/// The actor and the object are fixed at construction. Everything else is
/// maintained by the store, except the message and verb which callers set
/// before saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    id: Option<CommentId>,
    parent_id: String,
    topmost_parent_id: String,
    children_count: u32,
    message: String,
    verb: String,
    actor: Actor,
    creation_date_time: Option<DateTime<Utc>>,
    latest_child_date_time: Option<DateTime<Utc>>,
    object: ObjectRef,
}

impl Comment {
    /// Creates an unsaved comment with no message and no verb.
    pub fn new(actor: Actor, object: ObjectRef) -> Self {
        Self {
            id: None,
            parent_id: ROOT_PARENT_ID.to_string(),
            topmost_parent_id: ROOT_PARENT_ID.to_string(),
            children_count: 0,
            message: String::new(),
            verb: String::new(),
            actor,
            creation_date_time: None,
            latest_child_date_time: None,
            object,
        }
    }

    pub fn id(&self) -> Option<CommentId> {
        self.id
    }

    /// Assigned by the store when the comment is first persisted.
    pub fn set_id(&mut self, id: CommentId) {
        self.id = Some(id);
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Makes this comment a reply. An empty id is normalized to the root marker.
    pub fn set_parent_id(&mut self, parent_id: impl Into<String>) {
        let parent_id = parent_id.into();
        self.parent_id = if parent_id.is_empty() {
            ROOT_PARENT_ID.to_string()
        } else {
            parent_id
        };
    }

    /// Whether this comment starts a thread.
    pub fn is_root(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }

    pub fn topmost_parent_id(&self) -> &str {
        &self.topmost_parent_id
    }

    pub fn set_topmost_parent_id(&mut self, id: impl Into<String>) {
        self.topmost_parent_id = id.into();
    }

    pub fn children_count(&self) -> u32 {
        self.children_count
    }

    pub fn set_children_count(&mut self, count: u32) {
        self.children_count = count;
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Replaces the message with `message`, trimmed.
    ///
    /// Fails with [`CommentError::MessageTooLong`] if the trimmed message has
    /// more than [`MAX_MESSAGE_LENGTH`] characters; the previous message is
    /// kept in that case.
    pub fn set_message(&mut self, message: &str) -> CommentResult<()> {
        let trimmed = message.trim();
        if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(CommentError::MessageTooLong {
                max: MAX_MESSAGE_LENGTH,
            });
        }
        self.message = trimmed.to_string();
        Ok(())
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn set_verb(&mut self, verb: impl Into<String>) {
        self.verb = verb.into();
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn creation_date_time(&self) -> Option<DateTime<Utc>> {
        self.creation_date_time
    }

    pub fn set_creation_date_time(&mut self, at: DateTime<Utc>) {
        self.creation_date_time = Some(at);
    }

    pub fn latest_child_date_time(&self) -> Option<DateTime<Utc>> {
        self.latest_child_date_time
    }

    pub fn set_latest_child_date_time(&mut self, at: Option<DateTime<Utc>>) {
        self.latest_child_date_time = at;
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }
}
