use bytes::Bytes;
use chrono::{DateTime, Utc};
use commentdav_model::{ActorType, CommentError};
use http::header::{CONTENT_LOCATION, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::comment_node::message_too_long;
use crate::properties::parse_datetime;
use crate::{xml, CommentsTree, DavError, DavNode, DavResult, EntityCollection, ROOT_NAME};

/// Clark name of the comment filter report.
pub const REPORT_FILTER_COMMENTS: &str = "{http://owncloud.org/ns}filter-comments";

/// Body of a comment creation request.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NewComment {
    actor_type: Option<String>,
    verb: Option<String>,
    message: Option<String>,
}

/// Handles comment creation (`POST`) and the `filter-comments` `REPORT`.
///
/// Both handlers return `Ok(None)` for requests they do not own, so the
/// caller can fall back to default handling.
pub struct CommentsPlugin {
    tree: CommentsTree,
    base_uri: String,
}

impl CommentsPlugin {
    /// `base_uri` is the DAV base, e.g. `/remote.php/dav/`.
    pub fn new(tree: CommentsTree, base_uri: impl Into<String>) -> Self {
        let mut base_uri = base_uri.into();
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }
        Self { tree, base_uri }
    }

    pub fn tree(&self) -> &CommentsTree {
        &self.tree
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The path below the DAV base, if the request targets it at all.
    pub fn relative_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let base = self.base_uri.trim_end_matches('/');
        let rest = path.strip_prefix(base)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(rest.trim_start_matches('/'))
    }

    fn is_comments_path(path: &str) -> bool {
        path.split('/').next() == Some(ROOT_NAME) && path.len() > ROOT_NAME.len() + 1
    }

    fn entity_collection(&self, path: &str) -> DavResult<Option<EntityCollection>> {
        match self.tree.node_for_path(path)? {
            DavNode::Entity(collection) => Ok(Some(collection)),
            _ => Ok(None),
        }
    }

    /// Creates a comment from a JSON body posted to an entity collection.
    pub fn http_post(&self, request: &Request<Bytes>) -> DavResult<Option<Response<Bytes>>> {
        let full_path = request.uri().path();
        let Some(path) = self.relative_path(full_path) else {
            return Ok(None);
        };
        if !Self::is_comments_path(path) {
            return Ok(None);
        }
        let Some(collection) = self.entity_collection(path)? else {
            return Ok(None);
        };

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let mime = content_type.split(';').next().unwrap_or_default().trim();
        if !mime.eq_ignore_ascii_case("application/json") {
            return Err(DavError::UnsupportedMediaType(
                "Comments must be sent as application/json".to_string(),
            ));
        }

        let body: NewComment = serde_json::from_slice(request.body())
            .map_err(|e| DavError::BadRequest(format!("Invalid JSON body: {e}")))?;
        let id = self.create_comment(&collection, body)?;
        collection.set_read_marker(None)?;

        let location = format!(
            "{}/{}",
            full_path.trim_end_matches('/'),
            urlencoding::encode(&id)
        );
        Response::builder()
            .status(StatusCode::CREATED)
            .header(CONTENT_LOCATION, location)
            .body(Bytes::new())
            .map(Some)
            .map_err(|e| DavError::BadRequest(e.to_string()))
    }

    fn create_comment(&self, collection: &EntityCollection, body: NewComment) -> DavResult<String> {
        let required = |field: &str| DavError::BadRequest(format!("Missing \"{field}\""));
        let actor_type = body.actor_type.ok_or_else(|| required("actorType"))?;
        let verb = body.verb.ok_or_else(|| required("verb"))?;
        let message = body.message.ok_or_else(|| required("message"))?;

        let ctx = collection.context();
        let actor_type = ActorType::from(actor_type.as_str());
        if !ctx.authorizer().supports(&actor_type) {
            return Err(DavError::BadRequest(format!("Invalid actor \"{actor_type}\"")));
        }
        if verb.trim().is_empty() {
            return Err(DavError::BadRequest("Invalid verb".to_string()));
        }
        if message.trim().is_empty() {
            return Err(DavError::BadRequest("Comment message must not be empty".to_string()));
        }

        let user = ctx.current_user().ok_or(DavError::NotAuthenticated)?;
        let actor = ctx
            .authorizer()
            .actor_for_new_comment(&actor_type, &user)
            .ok_or_else(|| DavError::BadRequest(format!("Invalid actor \"{actor_type}\"")))?;

        let mut comment = ctx.store().create(actor, collection.object().clone());
        comment.set_message(&message).map_err(|e| match e {
            CommentError::MessageTooLong { .. } => message_too_long(),
            other => DavError::Store(other),
        })?;
        comment.set_verb(verb);
        ctx.store().save(&mut comment).map_err(|e| match e {
            CommentError::MessageTooLong { .. } => message_too_long(),
            CommentError::InvalidArgument(_) => {
                DavError::BadRequest("Invalid input values".to_string())
            }
            other => DavError::Store(other),
        })?;

        let id = comment
            .id()
            .map(|id| id.to_string())
            .ok_or_else(|| DavError::Store(CommentError::Storage("saved comment has no id".to_string())))?;
        info!(
            comment_id = %id,
            object_type = collection.object_type(),
            object_id = collection.id(),
            user = %user.uid,
            "Comment created"
        );
        Ok(id)
    }

    /// Answers a `filter-comments` report on an entity collection. `path` is
    /// relative to the DAV base.
    pub fn on_report(
        &self,
        report_name: &str,
        body: &[u8],
        path: &str,
    ) -> DavResult<Option<Response<Bytes>>> {
        if report_name != REPORT_FILTER_COMMENTS {
            return Ok(None);
        }
        let Some(collection) = self.entity_collection(path)? else {
            return Ok(None);
        };

        let filter = xml::parse_filter_comments(body)?;
        let limit = parse_count("limit", filter.limit())?;
        let offset = parse_count("offset", filter.offset())?;
        let since: Option<DateTime<Utc>> = filter.datetime().map(parse_datetime).transpose()?;
        debug!(limit, offset, since = ?since, path, "Filtering comments");

        let prefix = format!("{}{}", self.base_uri, path.trim_matches('/'));
        let mut responses = Vec::new();
        for node in collection.find_children(limit, offset, since)? {
            let href = format!("{prefix}/{}", node.name()?);
            responses.push((href, node.properties(&[])?));
        }

        Response::builder()
            .status(StatusCode::MULTI_STATUS)
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(Bytes::from(xml::write_multistatus(&responses)?))
            .map(Some)
            .map_err(|e| DavError::BadRequest(e.to_string()))
    }
}

fn parse_count(field: &str, raw: Option<&str>) -> DavResult<usize> {
    match raw {
        None => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| DavError::BadRequest(format!("Invalid {field} \"{raw}\""))),
    }
}
