//! Shared fixtures for the DAV tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use commentdav_dav::{CommentsContext, EntityTypeRegistry};
use commentdav_model::{
    Actor, Comment, CommentId, CommentResult, CommentStore, ForObjectQuery, ObjectRef, User,
    UserDirectory,
};
use commentdav_store::SqliteCommentStore;

/// A store call observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { actor: Actor, object: ObjectRef },
    GetForObject { object: ObjectRef, query: ForObjectQuery },
    Save(Option<CommentId>),
    Delete(CommentId),
    SetReadMark { uid: String, object: ObjectRef },
}

/// An in-memory SQLite store that records every call made through the
/// [`CommentStore`] trait. Fixtures seed data through [`RecordingStore::inner`]
/// so only calls made by the code under test show up.
pub struct RecordingStore {
    inner: SqliteCommentStore,
    calls: Mutex<Vec<Call>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteCommentStore::open_in_memory().unwrap(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn inner(&self) -> &SqliteCommentStore {
        &self.inner
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::GetForObject { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CommentStore for RecordingStore {
    fn create(&self, actor: Actor, object: ObjectRef) -> Comment {
        self.record(Call::Create {
            actor: actor.clone(),
            object: object.clone(),
        });
        self.inner.create(actor, object)
    }

    fn get(&self, id: CommentId) -> CommentResult<Comment> {
        self.inner.get(id)
    }

    fn get_for_object(&self, object: &ObjectRef, query: ForObjectQuery) -> CommentResult<Vec<Comment>> {
        self.record(Call::GetForObject {
            object: object.clone(),
            query,
        });
        self.inner.get_for_object(object, query)
    }

    fn save(&self, comment: &mut Comment) -> CommentResult<()> {
        self.record(Call::Save(comment.id()));
        self.inner.save(comment)
    }

    fn delete(&self, id: CommentId) -> CommentResult<bool> {
        self.record(Call::Delete(id));
        self.inner.delete(id)
    }

    fn read_mark(&self, object: &ObjectRef, user: &User) -> CommentResult<Option<DateTime<Utc>>> {
        self.inner.read_mark(object, user)
    }

    fn set_read_mark(
        &self,
        object: &ObjectRef,
        user: &User,
        at: Option<DateTime<Utc>>,
    ) -> CommentResult<()> {
        self.record(Call::SetReadMark {
            uid: user.uid.clone(),
            object: object.clone(),
        });
        self.inner.set_read_mark(object, user, at)
    }
}

/// A fixed set of accounts.
pub struct StaticUsers(HashMap<String, User>);

impl UserDirectory for StaticUsers {
    fn get(&self, uid: &str) -> Option<User> {
        self.0.get(uid).cloned()
    }
}

pub fn users() -> Arc<StaticUsers> {
    let users = [User::new("alice", "Alice Liddell"), User::new("bob", "Bob")]
        .into_iter()
        .map(|u| (u.uid.clone(), u))
        .collect();
    Arc::new(StaticUsers(users))
}

/// Context for a request by `uid`, or an anonymous one.
pub fn context(store: &Arc<RecordingStore>, uid: Option<&str>) -> CommentsContext {
    let users = users();
    let session = uid.and_then(|uid| users.get(uid));
    CommentsContext::new(store.clone(), users, Arc::new(session))
}

pub fn files_42() -> ObjectRef {
    ObjectRef::new("files", "42")
}

/// Saves a comment directly, bypassing call recording.
pub fn seed_comment(store: &RecordingStore, author: &str, object: &ObjectRef, message: &str) -> Comment {
    let mut comment = store.inner().create(Actor::user(author), object.clone());
    comment.set_message(message).unwrap();
    comment.set_verb("comment");
    store.inner().save(&mut comment).unwrap();
    comment
}

/// A registry with `files`, where only object ids `42` and `43` exist.
pub fn registry() -> Arc<EntityTypeRegistry> {
    let mut registry = EntityTypeRegistry::new();
    registry.register_entity_type("files", |id: &str| id == "42" || id == "43");
    Arc::new(registry)
}
