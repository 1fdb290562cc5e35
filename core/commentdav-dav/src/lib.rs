//! DAV resource tree for comments.
//!
//! Comments are exposed under `comments/{objectType}/{objectId}/{commentId}`:
//!
//! - [`RootCollection`]: `comments`, lists the registered object types
//! - [`EntityTypeCollection`]: e.g. `comments/files`, validates object ids
//! - [`EntityCollection`]: e.g. `comments/files/42`, the comments on one object
//! - [`CommentNode`]: one comment, with its properties
//!
//! Every node is a cheap value rebuilt on each request from a shared
//! [`CommentsContext`]. Nothing is cached across requests.
//!
//! [`CommentsPlugin`] handles the two verbs that go beyond plain resource
//! access: `POST` on an entity collection creates a comment, and the
//! `filter-comments` `REPORT` returns a filtered, paginated multistatus.
//!
//! Write access is decided by the [`ActorAuthorizer`], a registry of
//! per-actor-type checkers. Only `users` is registered by default.

mod authz;
mod comment_node;
mod context;
mod entity_collection;
mod entity_type_collection;
mod error;
mod node;
mod plugin;
mod prop_patch;
pub mod properties;
mod root_collection;
mod tree;
pub mod xml;

pub use authz::{ActorAuthorizer, ActorTypeChecker, UsersActorChecker};
pub use comment_node::CommentNode;
pub use context::CommentsContext;
pub use entity_collection::EntityCollection;
pub use entity_type_collection::{EntityExistence, EntityTypeCollection};
pub use error::{DavError, DavResult};
pub use node::{DavCollection, DavNode};
pub use plugin::{CommentsPlugin, REPORT_FILTER_COMMENTS};
pub use prop_patch::PropPatch;
pub use properties::PropertyMap;
pub use root_collection::{
    EntityTypeCollector, EntityTypeProvider, EntityTypeRegistry, RootCollection, ROOT_NAME,
};
pub use tree::CommentsTree;
