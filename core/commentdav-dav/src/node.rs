use chrono::{DateTime, Utc};

use crate::{
    CommentNode, DavError, DavResult, EntityCollection, EntityTypeCollection, PropPatch,
    PropertyMap, RootCollection,
};

/// Operations every collection in the comments tree supports.
///
/// Structural mutations are refused by default; the comments tree is only
/// ever changed through the store.
pub trait DavCollection {
    fn name(&self) -> String;

    fn child(&self, name: &str) -> DavResult<DavNode>;

    fn children(&self) -> DavResult<Vec<DavNode>>;

    fn child_exists(&self, name: &str) -> DavResult<bool>;

    fn create_file(&self, _name: &str, _data: &[u8]) -> DavResult<()> {
        Err(DavError::Forbidden("Cannot create comments by id".to_string()))
    }

    fn create_directory(&self, _name: &str) -> DavResult<()> {
        Err(DavError::Forbidden("Permission denied to create collections".to_string()))
    }

    fn delete(&self) -> DavResult<()> {
        Err(DavError::Forbidden("Permission denied to delete this resource".to_string()))
    }

    fn set_name(&mut self, _name: &str) -> DavResult<()> {
        Err(DavError::Forbidden("Permission denied to rename this resource".to_string()))
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Any node the comments tree can resolve to.
pub enum DavNode {
    Root(RootCollection),
    EntityType(EntityTypeCollection),
    Entity(EntityCollection),
    Comment(CommentNode),
}

impl DavNode {
    /// The node viewed as a collection, unless it is a comment.
    pub fn as_collection(&self) -> Option<&dyn DavCollection> {
        match self {
            Self::Root(node) => Some(node),
            Self::EntityType(node) => Some(node),
            Self::Entity(node) => Some(node),
            Self::Comment(_) => None,
        }
    }

    pub fn as_entity_collection(&self) -> Option<&EntityCollection> {
        match self {
            Self::Entity(node) => Some(node),
            _ => None,
        }
    }

    pub fn name(&self) -> DavResult<String> {
        match self {
            Self::Comment(node) => node.name(),
            _ => Ok(self.as_collection().map(|c| c.name()).unwrap_or_default()),
        }
    }

    pub fn child(&self, name: &str) -> DavResult<DavNode> {
        match self.as_collection() {
            Some(collection) => collection.child(name),
            None => Err(DavError::NotFound(format!("Node \"{name}\" not found"))),
        }
    }

    pub fn children(&self) -> DavResult<Vec<DavNode>> {
        match self.as_collection() {
            Some(collection) => collection.children(),
            None => Ok(Vec::new()),
        }
    }

    pub fn delete(&self) -> DavResult<()> {
        match self {
            Self::Comment(node) => node.delete(),
            Self::Root(node) => node.delete(),
            Self::EntityType(node) => node.delete(),
            Self::Entity(node) => node.delete(),
        }
    }

    /// Properties of this node; structural collections have none.
    pub fn properties(&self, requested: &[&str]) -> DavResult<PropertyMap> {
        match self {
            Self::Comment(node) => node.properties(requested),
            Self::Entity(node) => node.properties(requested),
            Self::Root(_) | Self::EntityType(_) => Ok(crate::properties::select(
                PropertyMap::new(),
                requested,
            )),
        }
    }

    /// Registers the handlers this node offers for `patch`.
    pub fn prop_patch<'a>(&'a mut self, patch: &mut PropPatch<'a>) {
        match self {
            Self::Comment(node) => node.prop_patch(patch),
            Self::Entity(node) => node.prop_patch(patch),
            Self::Root(_) | Self::EntityType(_) => {}
        }
    }
}
