//! SQLite storage for comments.
//!
//! Implements [`commentdav_model::CommentStore`] on top of a single SQLite
//! connection guarded by a mutex.
//!
//! # Layout
//!
//! - `comments` holds one row per comment, timestamps as microseconds since
//!   the Unix epoch
//! - `comments_read_markers` holds one row per `(user, object_type, object_id)`
//!
//! Saving a reply recounts the parent's children and stamps the parent's
//! latest-child time, so thread summaries stay consistent with the rows.

mod comment_store;

pub use comment_store::SqliteCommentStore;
