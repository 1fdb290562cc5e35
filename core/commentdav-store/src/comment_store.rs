use chrono::{DateTime, SubsecRound, Utc};
use commentdav_model::{
    Actor, ActorType, Comment, CommentError, CommentId, CommentResult, CommentStore,
    ForObjectQuery, ObjectRef, User, ROOT_PARENT_ID,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SELECT_COLUMNS: &str = "id, parent_id, topmost_parent_id, children_count, actor_type, \
     actor_id, message, verb, creation_timestamp, latest_child_timestamp, object_type, object_id";

/// Comment store backed by SQLite.
#[derive(Clone)]
pub struct SqliteCommentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCommentStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> CommentResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| CommentError::Storage(format!("failed to open comment store: {e}")))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> CommentResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CommentError::Storage(format!("failed to open in-memory comment store: {e}"))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> CommentResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CommentResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id TEXT NOT NULL DEFAULT '0',
                topmost_parent_id TEXT NOT NULL DEFAULT '0',
                children_count INTEGER NOT NULL DEFAULT 0,
                actor_type TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                message TEXT NOT NULL,
                verb TEXT NOT NULL,
                creation_timestamp INTEGER NOT NULL,
                latest_child_timestamp INTEGER,
                object_type TEXT NOT NULL,
                object_id TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS comments_object_index
                ON comments (object_type, object_id, creation_timestamp);

            CREATE INDEX IF NOT EXISTS comments_parent_id_index
                ON comments (parent_id);

            CREATE TABLE IF NOT EXISTS comments_read_markers (
                user_id TEXT NOT NULL,
                object_type TEXT NOT NULL,
                object_id TEXT NOT NULL,
                marker_datetime INTEGER NOT NULL,
                UNIQUE(user_id, object_type, object_id)
            );
            ",
        )
        .map_err(|e| CommentError::Storage(format!("failed to init comment schema: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> CommentResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CommentError::Storage("comment store lock poisoned".to_string()))
    }
}

impl CommentStore for SqliteCommentStore {
    fn create(&self, actor: Actor, object: ObjectRef) -> Comment {
        Comment::new(actor, object)
    }

    fn get(&self, id: CommentId) -> CommentResult<Comment> {
        let conn = self.lock()?;
        load_comment(&conn, id)
    }

    fn get_for_object(&self, object: &ObjectRef, query: ForObjectQuery) -> CommentResult<Vec<Comment>> {
        let conn = self.lock()?;
        // A negative LIMIT is "no limit" in SQLite, a negative OFFSET is zero.
        // Out-of-range bounds saturate.
        let limit: i64 = if query.limit == 0 {
            -1
        } else {
            i64::try_from(query.limit).unwrap_or(i64::MAX)
        };
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        let since = query.not_older_than.map(|at| at.timestamp_micros());

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM comments \
             WHERE object_type = ?1 AND object_id = ?2 \
             AND (?3 IS NULL OR creation_timestamp > ?3) \
             ORDER BY creation_timestamp DESC, id DESC LIMIT ?4 OFFSET ?5"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CommentError::Storage(format!("failed to prepare comment query: {e}")))?;
        let rows = stmt
            .query_map(
                params![object.object_type, object.object_id, since, limit, offset],
                read_row,
            )
            .map_err(|e| CommentError::Storage(format!("failed to query comments: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let row = row.map_err(|e| CommentError::Storage(format!("failed to read comment row: {e}")))?;
            result.push(row.into_comment()?);
        }
        Ok(result)
    }

    fn save(&self, comment: &mut Comment) -> CommentResult<()> {
        if comment.actor().actor_type.as_str().is_empty()
            || comment.actor().id.is_empty()
            || comment.object().object_type.is_empty()
            || comment.object().object_id.is_empty()
            || comment.verb().is_empty()
        {
            return Err(CommentError::InvalidArgument(
                "Actor, Object and Verb information must be provided for saving".to_string(),
            ));
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CommentError::Storage(format!("failed to begin transaction: {e}")))?;

        if comment.id().is_none() {
            comment.set_children_count(0);
            comment.set_latest_child_date_time(None);
        }
        // Stored with microsecond precision; keep the in-memory copy identical.
        let created = comment
            .creation_date_time()
            .unwrap_or_else(Utc::now)
            .trunc_subsecs(6);
        comment.set_creation_date_time(created);
        if comment.is_root() {
            comment.set_topmost_parent_id(ROOT_PARENT_ID);
        } else {
            let topmost = determine_topmost_parent_id(&tx, comment.parent_id())?;
            comment.set_topmost_parent_id(topmost);
        }

        match comment.id() {
            None => {
                tx.execute(
                    "INSERT INTO comments (parent_id, topmost_parent_id, children_count, actor_type, \
                     actor_id, message, verb, creation_timestamp, latest_child_timestamp, object_type, object_id) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        comment.parent_id(),
                        comment.topmost_parent_id(),
                        comment.children_count(),
                        comment.actor().actor_type.as_str(),
                        comment.actor().id,
                        comment.message(),
                        comment.verb(),
                        created.timestamp_micros(),
                        comment.latest_child_date_time().map(|at| at.timestamp_micros()),
                        comment.object().object_type,
                        comment.object().object_id,
                    ],
                )
                .map_err(|e| CommentError::Storage(format!("failed to insert comment: {e}")))?;
                let raw = tx.last_insert_rowid();
                let id = CommentId::new(raw as u64)
                    .ok_or_else(|| CommentError::Storage(format!("invalid row id {raw}")))?;
                comment.set_id(id);
                debug!(comment_id = %id, object_type = %comment.object().object_type, "Inserted comment");
            }
            Some(id) => {
                let affected = tx
                    .execute(
                        "UPDATE comments SET parent_id = ?1, topmost_parent_id = ?2, children_count = ?3, \
                         message = ?4, verb = ?5, creation_timestamp = ?6, latest_child_timestamp = ?7 \
                         WHERE id = ?8",
                        params![
                            comment.parent_id(),
                            comment.topmost_parent_id(),
                            comment.children_count(),
                            comment.message(),
                            comment.verb(),
                            created.timestamp_micros(),
                            comment.latest_child_date_time().map(|at| at.timestamp_micros()),
                            id.get() as i64,
                        ],
                    )
                    .map_err(|e| CommentError::Storage(format!("failed to update comment: {e}")))?;
                if affected == 0 {
                    return Err(CommentError::NotFound(format!(
                        "comment to update ceased to exist: {id}"
                    )));
                }
                debug!(comment_id = %id, "Updated comment");
            }
        }

        if !comment.is_root() {
            update_children_information(&tx, comment.parent_id(), created)?;
        }

        tx.commit()
            .map_err(|e| CommentError::Storage(format!("failed to commit comment: {e}")))?;
        Ok(())
    }

    fn delete(&self, id: CommentId) -> CommentResult<bool> {
        let conn = self.lock()?;
        let affected = conn
            .execute("DELETE FROM comments WHERE id = ?1", params![id.get() as i64])
            .map_err(|e| CommentError::Storage(format!("failed to delete comment: {e}")))?;
        debug!(comment_id = %id, deleted = affected > 0, "Deleted comment");
        Ok(affected > 0)
    }

    fn read_mark(&self, object: &ObjectRef, user: &User) -> CommentResult<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let micros: Option<i64> = conn
            .query_row(
                "SELECT marker_datetime FROM comments_read_markers \
                 WHERE user_id = ?1 AND object_type = ?2 AND object_id = ?3",
                params![user.uid, object.object_type, object.object_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CommentError::Storage(format!("failed to load read marker: {e}")))?;
        micros.map(from_micros).transpose()
    }

    fn set_read_mark(
        &self,
        object: &ObjectRef,
        user: &User,
        at: Option<DateTime<Utc>>,
    ) -> CommentResult<()> {
        if object.object_type.is_empty() || object.object_id.is_empty() {
            return Err(CommentError::InvalidArgument(
                "Object parameters must be string and not empty".to_string(),
            ));
        }
        let at = at.unwrap_or_else(Utc::now);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO comments_read_markers (user_id, object_type, object_id, marker_datetime) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(user_id, object_type, object_id) DO UPDATE SET marker_datetime = excluded.marker_datetime",
            params![user.uid, object.object_type, object.object_id, at.timestamp_micros()],
        )
        .map_err(|e| CommentError::Storage(format!("failed to save read marker: {e}")))?;
        Ok(())
    }
}

/// Raw column values of one `comments` row.
struct CommentRow {
    id: i64,
    parent_id: String,
    topmost_parent_id: String,
    children_count: u32,
    actor_type: String,
    actor_id: String,
    message: String,
    verb: String,
    creation: i64,
    latest_child: Option<i64>,
    object_type: String,
    object_id: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        topmost_parent_id: row.get(2)?,
        children_count: row.get(3)?,
        actor_type: row.get(4)?,
        actor_id: row.get(5)?,
        message: row.get(6)?,
        verb: row.get(7)?,
        creation: row.get(8)?,
        latest_child: row.get(9)?,
        object_type: row.get(10)?,
        object_id: row.get(11)?,
    })
}

impl CommentRow {
    fn into_comment(self) -> CommentResult<Comment> {
        let id = CommentId::new(self.id as u64)
            .ok_or_else(|| CommentError::Storage(format!("invalid comment id {}", self.id)))?;
        let mut comment = Comment::new(
            Actor::new(ActorType::from(self.actor_type), self.actor_id),
            ObjectRef::new(self.object_type, self.object_id),
        );
        comment.set_id(id);
        comment.set_parent_id(self.parent_id);
        comment.set_topmost_parent_id(self.topmost_parent_id);
        comment.set_children_count(self.children_count);
        comment
            .set_message(&self.message)
            .map_err(|e| CommentError::Storage(format!("stored comment {id} is invalid: {e}")))?;
        comment.set_verb(self.verb);
        comment.set_creation_date_time(from_micros(self.creation)?);
        comment.set_latest_child_date_time(self.latest_child.map(from_micros).transpose()?);
        Ok(comment)
    }
}

fn from_micros(micros: i64) -> CommentResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| CommentError::Storage(format!("timestamp out of range: {micros}")))
}

fn load_comment(conn: &Connection, id: CommentId) -> CommentResult<Comment> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM comments WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.get() as i64], read_row)
        .optional()
        .map_err(|e| CommentError::Storage(format!("failed to load comment: {e}")))?;
    match row {
        Some(row) => row.into_comment(),
        None => Err(CommentError::NotFound(id.to_string())),
    }
}

/// Walks up the parent chain to the comment that started the thread.
fn determine_topmost_parent_id(conn: &Connection, parent_id: &str) -> CommentResult<String> {
    let mut current: CommentId = parent_id.parse()?;
    loop {
        let comment = load_comment(conn, current)?;
        if comment.is_root() {
            return Ok(current.to_string());
        }
        current = comment.parent_id().parse()?;
    }
}

fn update_children_information(
    conn: &Connection,
    parent_id: &str,
    latest_child: DateTime<Utc>,
) -> CommentResult<()> {
    let parent: CommentId = parent_id.parse()?;
    let children: u32 = conn
        .query_row(
            "SELECT COUNT(id) FROM comments WHERE parent_id = ?1",
            params![parent_id],
            |row| row.get(0),
        )
        .map_err(|e| CommentError::Storage(format!("failed to count children: {e}")))?;
    let affected = conn
        .execute(
            "UPDATE comments SET children_count = ?1, latest_child_timestamp = ?2 WHERE id = ?3",
            params![children, latest_child.timestamp_micros(), parent.get() as i64],
        )
        .map_err(|e| CommentError::Storage(format!("failed to update parent comment: {e}")))?;
    if affected == 0 {
        return Err(CommentError::NotFound(parent.to_string()));
    }
    Ok(())
}
