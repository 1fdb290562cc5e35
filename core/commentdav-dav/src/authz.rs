//! Actor-based write authorization.
//!
//! Each actor type that may author or edit comments registers a checker.
//! Actor types without a checker are never authorized, so a misspelled or
//! unknown type fails closed.

use commentdav_model::{Actor, ActorType, User};
use std::collections::HashMap;

/// Decides what a session user may do for one actor type.
pub trait ActorTypeChecker: Send + Sync {
    /// Whether `user` may edit or delete a comment authored by `actor_id`.
    fn may_modify(&self, actor_id: &str, user: &User) -> bool;

    /// The actor id to record when `user` creates a comment as this type.
    /// `None` rejects the creation.
    fn actor_id_for_new_comment(&self, user: &User) -> Option<String>;
}

/// Comments authored by accounts. The author is the account itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsersActorChecker;

impl ActorTypeChecker for UsersActorChecker {
    fn may_modify(&self, actor_id: &str, user: &User) -> bool {
        actor_id == user.uid
    }

    fn actor_id_for_new_comment(&self, user: &User) -> Option<String> {
        Some(user.uid.clone())
    }
}

/// Registry of actor types allowed to write comments.
pub struct ActorAuthorizer {
    checkers: HashMap<ActorType, Box<dyn ActorTypeChecker>>,
}

impl ActorAuthorizer {
    /// An authorizer that allows nothing.
    pub fn empty() -> Self {
        Self {
            checkers: HashMap::new(),
        }
    }

    /// Registers (or replaces) the checker for `actor_type`.
    pub fn register(&mut self, actor_type: ActorType, checker: Box<dyn ActorTypeChecker>) {
        self.checkers.insert(actor_type, checker);
    }

    /// Whether comments may be written as `actor_type` at all.
    pub fn supports(&self, actor_type: &ActorType) -> bool {
        self.checkers.contains_key(actor_type)
    }

    /// Whether `user` may edit or delete a comment authored by `actor`.
    pub fn may_modify(&self, actor: &Actor, user: &User) -> bool {
        self.checkers
            .get(&actor.actor_type)
            .is_some_and(|checker| checker.may_modify(&actor.id, user))
    }

    /// The actor a new comment by `user` is attributed to, if allowed.
    pub fn actor_for_new_comment(&self, actor_type: &ActorType, user: &User) -> Option<Actor> {
        let checker = self.checkers.get(actor_type)?;
        let id = checker.actor_id_for_new_comment(user)?;
        Some(Actor::new(actor_type.clone(), id))
    }
}

impl Default for ActorAuthorizer {
    fn default() -> Self {
        let mut authorizer = Self::empty();
        authorizer.register(ActorType::Users, Box::new(UsersActorChecker));
        authorizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new("alice", "Alice")
    }

    #[test]
    fn default_supports_only_users() {
        let authz = ActorAuthorizer::default();
        assert!(authz.supports(&ActorType::Users));
        assert!(!authz.supports(&ActorType::Guests));
        assert!(!authz.supports(&ActorType::Bots));
        assert!(!authz.supports(&ActorType::Other("user".into())));
    }

    #[test]
    fn author_may_modify() {
        let authz = ActorAuthorizer::default();
        assert!(authz.may_modify(&Actor::user("alice"), &alice()));
        assert!(!authz.may_modify(&Actor::user("bob"), &alice()));
    }

    #[test]
    fn matching_id_with_other_type_is_denied() {
        let authz = ActorAuthorizer::default();
        let guest = Actor::new(ActorType::Guests, "alice");
        assert!(!authz.may_modify(&guest, &alice()));
    }

    #[test]
    fn new_comment_actor_comes_from_session() {
        let authz = ActorAuthorizer::default();
        let actor = authz.actor_for_new_comment(&ActorType::Users, &alice()).unwrap();
        assert_eq!(actor, Actor::user("alice"));
        assert!(authz.actor_for_new_comment(&ActorType::Bots, &alice()).is_none());
    }

    #[test]
    fn empty_denies_everything() {
        let authz = ActorAuthorizer::empty();
        assert!(!authz.supports(&ActorType::Users));
        assert!(!authz.may_modify(&Actor::user("alice"), &alice()));
    }

    #[test]
    fn custom_checker_can_be_registered() {
        struct AnyGuest;
        impl ActorTypeChecker for AnyGuest {
            fn may_modify(&self, _actor_id: &str, _user: &User) -> bool {
                true
            }
            fn actor_id_for_new_comment(&self, _user: &User) -> Option<String> {
                None
            }
        }

        let mut authz = ActorAuthorizer::default();
        authz.register(ActorType::Guests, Box::new(AnyGuest));
        assert!(authz.may_modify(&Actor::new(ActorType::Guests, "g1"), &alice()));
        assert!(authz.actor_for_new_comment(&ActorType::Guests, &alice()).is_none());
    }
}
