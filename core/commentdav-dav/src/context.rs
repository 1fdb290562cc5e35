use commentdav_model::{CommentStore, User, UserDirectory, UserSession};
use std::sync::Arc;

use crate::ActorAuthorizer;

/// Collaborators shared by every node of one request's tree.
///
/// Cloning is cheap; each node holds its own copy.
#[derive(Clone)]
pub struct CommentsContext {
    store: Arc<dyn CommentStore>,
    users: Arc<dyn UserDirectory>,
    session: Arc<dyn UserSession>,
    authorizer: Arc<ActorAuthorizer>,
}

impl CommentsContext {
    /// Creates a context with the default authorizer (only `users` may write).
    pub fn new(
        store: Arc<dyn CommentStore>,
        users: Arc<dyn UserDirectory>,
        session: Arc<dyn UserSession>,
    ) -> Self {
        Self {
            store,
            users,
            session,
            authorizer: Arc::new(ActorAuthorizer::default()),
        }
    }

    /// Replaces the authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<ActorAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn store(&self) -> &dyn CommentStore {
        self.store.as_ref()
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub fn authorizer(&self) -> &ActorAuthorizer {
        &self.authorizer
    }
}
