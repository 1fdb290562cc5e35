//! HTTP API serving the comments DAV tree.
//!
//! Every request is dispatched by method from a single fallback handler.
//! The core is synchronous, so each request runs on the blocking pool with
//! a freshly built tree.

pub mod config;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use commentdav_dav::{
    xml, ActorAuthorizer, CommentsContext, CommentsPlugin, CommentsTree, DavError, DavNode,
    DavResult, EntityTypeRegistry, PropPatch,
};
use commentdav_model::{CommentStore, User, UserDirectory};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, StatusCode};
use tracing::{debug, error, warn};

use crate::config::{ConfiguredUsers, ServerConfig};

/// Default DAV base path.
pub const DEFAULT_BASE_URI: &str = "/remote.php/dav/";

/// Default header carrying the authenticated user.
pub const DEFAULT_USER_HEADER: &str = "x-remote-user";

const MAX_BODY_BYTES: usize = 1024 * 1024;
const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Shared collaborators for every request.
pub struct AppState {
    store: Arc<dyn CommentStore>,
    users: Arc<ConfiguredUsers>,
    registry: Arc<EntityTypeRegistry>,
    authorizer: Arc<ActorAuthorizer>,
    user_header: HeaderName,
    base_uri: String,
}

impl AppState {
    pub fn new(store: Arc<dyn CommentStore>, config: &ServerConfig) -> Self {
        Self {
            store,
            users: Arc::new(config.directory()),
            registry: Arc::new(config.registry()),
            authorizer: Arc::new(ActorAuthorizer::default()),
            user_header: HeaderName::from_static(DEFAULT_USER_HEADER),
            base_uri: DEFAULT_BASE_URI.to_string(),
        }
    }

    /// Trusts `header` to carry the authenticated uid. It must be set by an
    /// authenticating proxy in front of this server.
    #[must_use]
    pub fn with_user_header(mut self, header: HeaderName) -> Self {
        self.user_header = header;
        self
    }

    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// The configured user named by the trusted header, if any.
    fn authenticate(&self, headers: &HeaderMap) -> Option<User> {
        let uid = headers.get(&self.user_header)?.to_str().ok()?.trim();
        let user = self.users.get(uid);
        if user.is_none() {
            warn!(uid, "Request names an unknown user");
        }
        user
    }

    fn plugin_for(&self, user: Option<User>) -> CommentsPlugin {
        let ctx = CommentsContext::new(self.store.clone(), self.users.clone(), Arc::new(user))
            .with_authorizer(self.authorizer.clone());
        CommentsPlugin::new(CommentsTree::new(ctx, self.registry.clone()), self.base_uri.clone())
    }
}

/// Build the HTTP router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            return error_response(&DavError::BadRequest(format!("Unreadable body: {e}")));
        }
    };
    let request = http::Request::from_parts(parts, body);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    match tokio::task::spawn_blocking(move || handle(&state, request)).await {
        Ok(Ok(response)) => {
            debug!(%method, path, status = %response.status(), "Request handled");
            response.map(Body::from).into_response()
        }
        Ok(Err(e)) => {
            debug!(%method, path, error = %e, "Request failed");
            error_response(&e)
        }
        Err(e) => {
            error!(%method, path, "Request handler panicked: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_response(e: &DavError) -> Response {
    let status = e.status();
    if status.is_server_error() {
        error!(error = %e, "Internal error");
    }
    match xml::write_error(e) {
        Ok(body) => (status, [(CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response(),
        Err(_) => status.into_response(),
    }
}

fn xml_response(status: StatusCode, body: Vec<u8>) -> DavResult<http::Response<Bytes>> {
    http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, XML_CONTENT_TYPE)
        .body(Bytes::from(body))
        .map_err(|e| DavError::BadRequest(e.to_string()))
}

fn handle(state: &AppState, request: http::Request<Bytes>) -> DavResult<http::Response<Bytes>> {
    let plugin = state.plugin_for(state.authenticate(request.headers()));
    let path = plugin
        .relative_path(request.uri().path())
        .map(str::to_string)
        .ok_or_else(|| DavError::NotFound(format!("{} is outside the DAV base", request.uri().path())))?;
    let body = request.body();

    match request.method().as_str() {
        "POST" => plugin
            .http_post(&request)?
            .ok_or_else(|| DavError::MethodNotAllowed("POST is not supported here".to_string())),
        "REPORT" => {
            let name = xml::parse_report_name(body)?;
            plugin
                .on_report(&name, body, &path)?
                .ok_or(DavError::ReportNotSupported(name))
        }
        "PROPFIND" => {
            let depth_one = request
                .headers()
                .get("depth")
                .and_then(|v| v.to_str().ok())
                .is_none_or(|depth| depth.trim() != "0");
            let requested = xml::parse_propfind(body)?;
            propfind(&plugin, &path, &requested, depth_one, StatusCode::MULTI_STATUS)
        }
        "PROPPATCH" => proppatch(&plugin, &path, body),
        "DELETE" => {
            plugin.tree().node_for_path(&path)?.delete()?;
            http::Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(Bytes::new())
                .map_err(|e| DavError::BadRequest(e.to_string()))
        }
        "GET" => match plugin.tree().node_for_path(&path)? {
            DavNode::Comment(_) => propfind(&plugin, &path, &[], false, StatusCode::OK),
            _ => Err(DavError::MethodNotAllowed(
                "GET is only supported on comments".to_string(),
            )),
        },
        other => Err(DavError::MethodNotAllowed(format!("{other} is not supported"))),
    }
}

fn href(plugin: &CommentsPlugin, path: &str) -> String {
    format!("{}{}", plugin.base_uri(), path.trim_matches('/'))
}

fn propfind(
    plugin: &CommentsPlugin,
    path: &str,
    requested: &[String],
    depth_one: bool,
    status: StatusCode,
) -> DavResult<http::Response<Bytes>> {
    let names: Vec<&str> = requested.iter().map(String::as_str).collect();
    let node = plugin.tree().node_for_path(path)?;
    let base = href(plugin, path);

    let mut responses = vec![(base.clone(), node.properties(&names)?)];
    if depth_one && matches!(node, DavNode::Root(_) | DavNode::Entity(_)) {
        for child in node.children()? {
            responses.push((format!("{base}/{}", child.name()?), child.properties(&names)?));
        }
    }
    xml_response(status, xml::write_multistatus(&responses)?)
}

fn proppatch(plugin: &CommentsPlugin, path: &str, body: &[u8]) -> DavResult<http::Response<Bytes>> {
    let mutations = xml::parse_propertyupdate(body)?;
    let mut node = plugin.tree().node_for_path(path)?;
    let mut patch = PropPatch::new(mutations);
    node.prop_patch(&mut patch);
    let statuses = patch.commit()?;
    xml_response(
        StatusCode::MULTI_STATUS,
        xml::write_proppatch_multistatus(&href(plugin, path), &statuses)?,
    )
}
