//! Core comment model for the DAV comments service.
//!
//! Defines the types every other crate in the workspace depends on:
//! - [`Comment`]: one comment, attached to an object and authored by an actor
//! - [`Actor`] / [`ActorType`]: who wrote a comment
//! - [`ObjectRef`]: what a comment is attached to (e.g. `files` / `42`)
//! - [`CommentStore`], [`UserDirectory`], [`UserSession`]: the collaborator
//!   contracts the DAV layer is written against
//! - [`CommentError`]: the enumerated failure kinds a store may report
//!
//! Nothing here touches the network or the database; storage lives in
//! `commentdav-store` and the resource tree in `commentdav-dav`.

mod actor;
mod comment;
mod error;
mod ids;
mod store;
mod user;

pub use actor::{Actor, ActorType};
pub use comment::{Comment, ObjectRef, MAX_MESSAGE_LENGTH, ROOT_PARENT_ID};
pub use error::{CommentError, CommentResult};
pub use ids::CommentId;
pub use store::{CommentStore, ForObjectQuery};
pub use user::{User, UserDirectory, UserSession};
