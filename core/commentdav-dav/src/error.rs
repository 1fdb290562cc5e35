//! Error types for the DAV layer.

use commentdav_model::CommentError;
use http::StatusCode;
use thiserror::Error;

/// Result type for DAV operations.
pub type DavResult<T> = Result<T, DavError>;

/// Protocol-level failures. Each maps to one HTTP status.
#[derive(Debug, Error)]
pub enum DavError {
    /// No authenticated user for an operation that requires one.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The target does not support the requested report.
    #[error("report not supported: {0}")]
    ReportNotSupported(String),

    /// Two providers registered the same object type.
    #[error("duplicate entity name \"{0}\"")]
    DuplicateEntityType(String),

    /// Malformed XML request body.
    #[error("xml error: {0}")]
    Xml(String),

    /// Failure reported by the comment store.
    #[error(transparent)]
    Store(#[from] CommentError),
}

impl DavError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::ReportNotSupported(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Xml(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::DuplicateEntityType(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(err) => match err {
                CommentError::NotFound(_) => StatusCode::NOT_FOUND,
                CommentError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Short exception name reported in the XML error body.
    pub fn exception_name(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NotAuthenticated",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::BadRequest(_) | Self::Xml(_) => "BadRequest",
            Self::UnsupportedMediaType(_) => "UnsupportedMediaType",
            Self::MethodNotAllowed(_) => "MethodNotAllowed",
            Self::ReportNotSupported(_) => "ReportNotSupported",
            Self::DuplicateEntityType(_) => "ServiceUnavailable",
            Self::Store(err) => match err {
                CommentError::NotFound(_) => "NotFound",
                CommentError::Conflict(_) => "Conflict",
                _ => "ServiceUnavailable",
            },
        }
    }
}
