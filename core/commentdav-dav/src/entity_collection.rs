use chrono::{DateTime, Utc};
use commentdav_model::{CommentError, CommentId, ForObjectQuery, ObjectRef};
use tracing::debug;

use crate::properties::{self, format_datetime, parse_datetime, PROP_READ_MARKER};
use crate::{
    CommentNode, CommentsContext, DavCollection, DavError, DavNode, DavResult, PropPatch,
    PropertyMap,
};

/// The comments attached to one object, e.g. `comments/files/42`.
///
/// Children are [`CommentNode`]s named by comment id. The collection also
/// carries the current user's read marker for the object.
#[derive(Clone)]
pub struct EntityCollection {
    ctx: CommentsContext,
    object: ObjectRef,
}

impl EntityCollection {
    pub fn new(
        ctx: CommentsContext,
        object_type: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            object: ObjectRef::new(object_type, object_id),
        }
    }

    /// The object id; also the collection name.
    pub fn id(&self) -> &str {
        &self.object.object_id
    }

    pub fn object_type(&self) -> &str {
        &self.object.object_type
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub(crate) fn context(&self) -> &CommentsContext {
        &self.ctx
    }

    /// Looks up a comment on this object by id.
    ///
    /// Unparseable ids, missing comments and comments that belong to another
    /// object are all reported as not found.
    pub fn comment(&self, name: &str) -> DavResult<CommentNode> {
        let not_found = || DavError::NotFound(format!("Comment \"{name}\" not found"));

        let id: CommentId = name.parse().map_err(|_| not_found())?;
        let comment = match self.ctx.store().get(id) {
            Ok(comment) => comment,
            Err(CommentError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        if comment.object() != &self.object {
            debug!(comment_id = %id, object = ?self.object, "Comment belongs to another object");
            return Err(not_found());
        }
        Ok(CommentNode::new(self.ctx.clone(), comment))
    }

    /// Every comment on the object, newest first.
    pub fn comments(&self) -> DavResult<Vec<CommentNode>> {
        self.find_children(0, 0, None)
    }

    /// A page of comments, newest first. Zero `limit` means no limit; `since`
    /// keeps only comments created after it.
    pub fn find_children(
        &self,
        limit: usize,
        offset: usize,
        since: Option<DateTime<Utc>>,
    ) -> DavResult<Vec<CommentNode>> {
        let query = ForObjectQuery {
            limit,
            offset,
            not_older_than: since,
        };
        let comments = self.ctx.store().get_for_object(&self.object, query)?;
        Ok(comments
            .into_iter()
            .map(|comment| CommentNode::new(self.ctx.clone(), comment))
            .collect())
    }

    /// Records that the current user has read the object's comments up to
    /// `at` (now if `None`).
    pub fn set_read_marker(&self, at: Option<DateTime<Utc>>) -> DavResult<bool> {
        let user = self.ctx.current_user().ok_or(DavError::NotAuthenticated)?;
        self.ctx.store().set_read_mark(&self.object, &user, at)?;
        Ok(true)
    }

    /// `readMarker` for the current user; unset when there is none.
    pub fn properties(&self, requested: &[&str]) -> DavResult<PropertyMap> {
        let marker = match self.ctx.current_user() {
            Some(user) => self.ctx.store().read_mark(&self.object, &user)?,
            None => None,
        };
        let mut all = PropertyMap::new();
        all.insert(PROP_READ_MARKER.to_string(), marker.map(format_datetime));
        Ok(properties::select(all, requested))
    }

    /// `readMarker` is writable; an empty value means now.
    pub fn prop_patch<'a>(&'a mut self, patch: &mut PropPatch<'a>) {
        patch.handle(PROP_READ_MARKER, move |value| {
            let at = match value.map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(parse_datetime(raw)?),
            };
            self.set_read_marker(at)
        });
    }
}

impl DavCollection for EntityCollection {
    fn name(&self) -> String {
        self.object.object_id.clone()
    }

    fn child(&self, name: &str) -> DavResult<DavNode> {
        self.comment(name).map(DavNode::Comment)
    }

    fn children(&self) -> DavResult<Vec<DavNode>> {
        Ok(self.comments()?.into_iter().map(DavNode::Comment).collect())
    }

    fn child_exists(&self, name: &str) -> DavResult<bool> {
        match self.comment(name) {
            Ok(_) => Ok(true),
            Err(DavError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
