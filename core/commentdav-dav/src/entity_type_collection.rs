use std::sync::Arc;

use crate::{CommentsContext, DavCollection, DavError, DavNode, DavResult, EntityCollection};

/// Decides whether an object id of one entity type exists and is visible to
/// the current user.
pub trait EntityExistence: Send + Sync {
    fn exists(&self, id: &str) -> bool;
}

impl<F> EntityExistence for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn exists(&self, id: &str) -> bool {
        self(id)
    }
}

/// All objects of one type, e.g. `comments/files`.
///
/// Children are resolved on demand through the existence check. Listing is
/// refused: there is no cheap way to enumerate every commentable object.
#[derive(Clone)]
pub struct EntityTypeCollection {
    ctx: CommentsContext,
    object_type: String,
    existence: Arc<dyn EntityExistence>,
}

impl EntityTypeCollection {
    pub fn new(
        ctx: CommentsContext,
        object_type: impl Into<String>,
        existence: Arc<dyn EntityExistence>,
    ) -> Self {
        Self {
            ctx,
            object_type: object_type.into(),
            existence,
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// The collection for object `id`, if it exists.
    pub fn entity(&self, id: &str) -> DavResult<EntityCollection> {
        if !self.existence.exists(id) {
            return Err(DavError::NotFound(
                "Entity does not exist or is not available".to_string(),
            ));
        }
        Ok(EntityCollection::new(self.ctx.clone(), &self.object_type, id))
    }
}

impl DavCollection for EntityTypeCollection {
    fn name(&self) -> String {
        self.object_type.clone()
    }

    fn child(&self, name: &str) -> DavResult<DavNode> {
        self.entity(name).map(DavNode::Entity)
    }

    fn children(&self) -> DavResult<Vec<DavNode>> {
        Err(DavError::MethodNotAllowed(
            "No permission to list folder contents".to_string(),
        ))
    }

    fn child_exists(&self, name: &str) -> DavResult<bool> {
        Ok(self.existence.exists(name))
    }
}
