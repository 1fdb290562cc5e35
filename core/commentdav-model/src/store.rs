use chrono::{DateTime, Utc};

use crate::{Actor, Comment, CommentId, CommentResult, ObjectRef, User};

/// Bounds for [`CommentStore::get_for_object`].
///
/// A `limit` or `offset` of zero means "unbounded" / "from the start".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForObjectQuery {
    pub limit: usize,
    pub offset: usize,
    /// Only comments created strictly after this instant.
    pub not_older_than: Option<DateTime<Utc>>,
}

impl ForObjectQuery {
    /// Every comment on the object.
    pub fn all() -> Self {
        Self::default()
    }
}

/// Persistence contract for comments and per-user read markers.
///
/// `create`, `save` and `delete` are the only write paths. Implementations
/// are responsible for their own concurrency control.
pub trait CommentStore: Send + Sync {
    /// Builds a new comment for `actor` on `object`. Nothing is persisted
    /// until [`CommentStore::save`] is called.
    fn create(&self, actor: Actor, object: ObjectRef) -> Comment;

    /// Loads a comment. Fails with [`crate::CommentError::NotFound`].
    fn get(&self, id: CommentId) -> CommentResult<Comment>;

    /// Comments on `object`, newest first.
    fn get_for_object(&self, object: &ObjectRef, query: ForObjectQuery) -> CommentResult<Vec<Comment>>;

    /// Inserts or updates. Assigns the id on insert.
    fn save(&self, comment: &mut Comment) -> CommentResult<()>;

    /// Removes a comment; returns whether anything was deleted.
    fn delete(&self, id: CommentId) -> CommentResult<bool>;

    /// The instant `user` last marked `object` as read.
    fn read_mark(&self, object: &ObjectRef, user: &User) -> CommentResult<Option<DateTime<Utc>>>;

    /// Records a read marker; `None` means now.
    fn set_read_mark(
        &self,
        object: &ObjectRef,
        user: &User,
        at: Option<DateTime<Utc>>,
    ) -> CommentResult<()>;
}
