use serde::{Deserialize, Serialize};

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub display_name: String,
}

impl User {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
        }
    }
}

/// Looks up accounts by uid.
pub trait UserDirectory: Send + Sync {
    fn get(&self, uid: &str) -> Option<User>;
}

/// Resolves the user the current request runs as.
pub trait UserSession: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

/// A session fixed at construction, e.g. resolved once per HTTP request.
impl UserSession for Option<User> {
    fn current_user(&self) -> Option<User> {
        self.clone()
    }
}
