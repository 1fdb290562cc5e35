use chrono::{DateTime, Utc};
use commentdav_model::{ActorType, Comment, CommentError, User, MAX_MESSAGE_LENGTH};
use tracing::{debug, error, info, warn};

use crate::properties::{self, *};
use crate::{CommentsContext, DavError, DavResult, PropPatch, PropertyMap};

/// A single comment as a DAV resource.
pub struct CommentNode {
    ctx: CommentsContext,
    comment: Comment,
}

impl CommentNode {
    pub fn new(ctx: CommentsContext, comment: Comment) -> Self {
        Self { ctx, comment }
    }

    pub fn comment(&self) -> &Comment {
        &self.comment
    }

    /// Names of every property [`CommentNode::properties`] reports.
    pub fn property_names() -> &'static [&'static str] {
        &COMMENT_PROPERTIES
    }

    /// The comment id.
    pub fn name(&self) -> DavResult<String> {
        self.comment
            .id()
            .map(|id| id.to_string())
            .ok_or_else(|| DavError::NotFound("comment has no id".to_string()))
    }

    /// Comments cannot be renamed.
    pub fn set_name(&mut self, _name: &str) -> DavResult<()> {
        Err(DavError::MethodNotAllowed("Renaming comments is not supported".to_string()))
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Deletes the comment. Only its author may do this.
    pub fn delete(&self) -> DavResult<()> {
        let user = self.check_write_access()?;
        let id = self
            .comment
            .id()
            .ok_or_else(|| DavError::NotFound("comment has no id".to_string()))?;
        self.ctx.store().delete(id)?;
        info!(comment_id = %id, user = %user.uid, "Comment deleted");
        Ok(())
    }

    /// Replaces the message and saves. Only the author may do this.
    pub fn update_comment(&mut self, message: &str) -> DavResult<bool> {
        self.check_write_access()?;

        let mut updated = self.comment.clone();
        match updated.set_message(message) {
            Ok(()) => {}
            Err(CommentError::MessageTooLong { .. }) => {
                debug!(comment = ?self.comment.id(), "Rejected overlong comment message");
                return Err(message_too_long());
            }
            Err(e) => {
                error!(comment = ?self.comment.id(), error = %e, "Failed to update comment message");
                return Err(DavError::Store(e));
            }
        }
        if let Err(e) = self.ctx.store().save(&mut updated) {
            error!(comment = ?self.comment.id(), error = %e, "Failed to save comment");
            return Err(DavError::Store(e));
        }

        self.comment = updated;
        Ok(true)
    }

    /// The message is the only writable property.
    pub fn prop_patch<'a>(&'a mut self, patch: &mut PropPatch<'a>) {
        patch.handle(PROP_MESSAGE, move |value| self.update_comment(value.unwrap_or_default()));
    }

    /// Property values for this comment; an empty `requested` returns all.
    pub fn properties(&self, requested: &[&str]) -> DavResult<PropertyMap> {
        let c = &self.comment;
        let mut all = PropertyMap::new();
        let mut put = |name: &str, value: Option<String>| {
            all.insert(name.to_string(), value);
        };

        put(PROP_ID, c.id().map(|id| id.to_string()));
        put(PROP_PARENT_ID, Some(c.parent_id().to_string()));
        put(PROP_TOPMOST_PARENT_ID, Some(c.topmost_parent_id().to_string()));
        put(PROP_CHILDREN_COUNT, Some(c.children_count().to_string()));
        put(PROP_MESSAGE, Some(c.message().to_string()));
        put(PROP_VERB, Some(c.verb().to_string()));
        put(PROP_ACTOR_TYPE, Some(c.actor().actor_type.to_string()));
        put(PROP_ACTOR_ID, Some(c.actor().id.clone()));
        put(PROP_ACTOR_DISPLAY_NAME, self.actor_display_name());
        put(PROP_CREATION_DATETIME, c.creation_date_time().map(format_datetime));
        put(PROP_LATEST_CHILD_DATETIME, c.latest_child_date_time().map(format_datetime));
        put(PROP_OBJECT_TYPE, Some(c.object().object_type.clone()));
        put(PROP_OBJECT_ID, Some(c.object().object_id.clone()));
        put(PROP_IS_UNREAD, self.is_unread()?);

        Ok(properties::select(all, requested))
    }

    fn actor_display_name(&self) -> Option<String> {
        let actor = self.comment.actor();
        if actor.actor_type != ActorType::Users {
            return None;
        }
        self.ctx.users().get(&actor.id).map(|user| user.display_name)
    }

    /// `"true"` unless the current user's read marker is at or after the
    /// comment's creation. Unset without a session user.
    fn is_unread(&self) -> DavResult<Option<String>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(None);
        };
        let read_mark = self.ctx.store().read_mark(self.comment.object(), &user)?;
        let unread = match (read_mark, self.comment.creation_date_time()) {
            (None, _) => true,
            (Some(mark), Some(created)) => created > mark,
            (Some(_), None) => false,
        };
        Ok(Some(unread.to_string()))
    }

    fn check_write_access(&self) -> DavResult<User> {
        match self.ctx.current_user() {
            Some(user) if self.ctx.authorizer().may_modify(self.comment.actor(), &user) => Ok(user),
            user => {
                warn!(
                    comment = ?self.comment.id(),
                    user = ?user.map(|u| u.uid),
                    "Write access to comment denied"
                );
                Err(DavError::Forbidden(
                    "Only authors are allowed to edit their comment.".to_string(),
                ))
            }
        }
    }
}

/// The error reported when a message exceeds the configured maximum.
pub(crate) fn message_too_long() -> DavError {
    DavError::BadRequest(format!(
        "Message exceeds allowed character limit of {MAX_MESSAGE_LENGTH}"
    ))
}
