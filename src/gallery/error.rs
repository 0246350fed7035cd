use crate::lifecycle::RequestStatus;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid request transition: {from} -> {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("{0}")]
    Request(RequestError),
}

pub type Result<T> = std::result::Result<T, GalleryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestErrorKind {
    Network,
    Http,
    Serialization,
    Internal,
}

/// Opaque failure payload carried by a rejected request.
///
/// Every caller coalesced onto the same in-flight request receives a clone of
/// the same value, so this is a plain data type rather than the source error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl RequestError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Internal,
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&GalleryError> for RequestError {
    fn from(err: &GalleryError) -> Self {
        let (kind, status) = match err {
            GalleryError::Network(_) => (RequestErrorKind::Network, None),
            GalleryError::Http { status, .. } => (RequestErrorKind::Http, Some(*status)),
            GalleryError::Serialization(_) => (RequestErrorKind::Serialization, None),
            GalleryError::Request(inner) => return inner.clone(),
            _ => (RequestErrorKind::Internal, None),
        };
        Self {
            kind,
            status,
            message: err.to_string(),
        }
    }
}

impl From<GalleryError> for RequestError {
    fn from(err: GalleryError) -> Self {
        RequestError::from(&err)
    }
}

impl From<RequestError> for GalleryError {
    fn from(err: RequestError) -> Self {
        GalleryError::Request(err)
    }
}
