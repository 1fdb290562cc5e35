use std::sync::Arc;

use crate::{CommentsContext, DavError, DavNode, DavResult, EntityTypeRegistry, RootCollection, ROOT_NAME};

/// Resolves request paths to nodes below the `comments` root.
#[derive(Clone)]
pub struct CommentsTree {
    root: RootCollection,
}

impl CommentsTree {
    pub fn new(ctx: CommentsContext, registry: Arc<EntityTypeRegistry>) -> Self {
        Self {
            root: RootCollection::new(ctx, registry),
        }
    }

    pub fn root(&self) -> &RootCollection {
        &self.root
    }

    /// Resolves a path relative to the DAV base, e.g. `comments/files/42/7`.
    ///
    /// Segments are percent-decoded. Empty segments are ignored, so leading
    /// and trailing slashes are harmless.
    pub fn node_for_path(&self, path: &str) -> DavResult<DavNode> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .map_err(|_| DavError::BadRequest(format!("Invalid path segment \"{segment}\"")))
        });

        match segments.next().transpose()? {
            Some(first) if first == ROOT_NAME => {}
            _ => return Err(DavError::NotFound(format!("Node \"{path}\" not found"))),
        }

        let mut node = DavNode::Root(self.root.clone());
        for segment in segments {
            node = node.child(&segment?)?;
        }
        Ok(node)
    }
}
