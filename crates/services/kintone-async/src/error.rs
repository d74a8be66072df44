use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exchange::RequestSummary;

/// Message of a classified error whose body yielded nothing usable
pub const UNKNOWN_MESSAGE: &str = "Unknown error.";

/// Shared handle to an error that led to a classification
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when using the kintone client
#[derive(Debug, Error)]
pub enum KintoneError {
    /// Transport failure with no response, passed through as raised
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed response, classified by status band and body
    #[error("API error: {0}")]
    Api(#[from] ClassifiedError),

    /// Configuration error (e.g., missing credentials)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl KintoneError {
    /// Returns the classified error, if this is one
    #[must_use]
    pub const fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Http(_) | Self::Config(_) | Self::Serde(_) => None,
        }
    }

    /// Returns the classification tag, if this is a classified error
    #[must_use]
    pub fn tag(&self) -> Option<ErrorTag> {
        self.classified().map(ClassifiedError::tag)
    }
}

/// Maps a serde deserialization error to a `KintoneError` with context
#[must_use]
pub fn map_deser(e: &serde_json::Error, body: &[u8]) -> KintoneError {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(400)]).to_string();
    KintoneError::Serde(format!("{e}: {snippet}"))
}

/// Status band of a failed response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// 4xx
    Client,
    /// 5xx
    Server,
    /// Any other band, including 3xx
    Request,
}

impl Category {
    /// Maps a status code to its band
    #[must_use]
    pub const fn from_status(code: u16) -> Self {
        match code / 100 {
            4 => Self::Client,
            5 => Self::Server,
            _ => Self::Request,
        }
    }
}

/// Whether a message could be extracted from the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The body matched a recognized error shape
    Known,
    /// The body could not be parsed or matched nothing
    Unknown,
}

/// Flat tag combining [`Resolution`] and [`Category`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    /// Known message, 4xx
    KnownClient,
    /// Known message, 5xx
    KnownServer,
    /// Known message, other band
    KnownRequest,
    /// No message, 4xx
    UnknownClient,
    /// No message, 5xx
    UnknownServer,
    /// No message, other band
    UnknownRequest,
}

impl ErrorTag {
    /// Combines a resolution and a category
    #[must_use]
    pub const fn new(resolution: Resolution, category: Category) -> Self {
        match (resolution, category) {
            (Resolution::Known, Category::Client) => Self::KnownClient,
            (Resolution::Known, Category::Server) => Self::KnownServer,
            (Resolution::Known, Category::Request) => Self::KnownRequest,
            (Resolution::Unknown, Category::Client) => Self::UnknownClient,
            (Resolution::Unknown, Category::Server) => Self::UnknownServer,
            (Resolution::Unknown, Category::Request) => Self::UnknownRequest,
        }
    }

    /// Returns the kebab-case name, e.g. `known-client`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KnownClient => "known-client",
            Self::KnownServer => "known-server",
            Self::KnownRequest => "known-request",
            Self::UnknownClient => "unknown-client",
            Self::UnknownServer => "unknown-server",
            Self::UnknownRequest => "unknown-request",
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `errors` map in a kintone JSON error body
///
/// kintone keys these by field path, e.g. `record.number.value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Key of the entry
    pub field: String,
    /// Messages reported for the key
    pub messages: Vec<String>,
}

/// A failed response turned into a typed, message-bearing error
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    category: Category,
    resolution: Resolution,
    message: String,
    status: StatusCode,
    request: RequestSummary,
    errors: Vec<FieldError>,
    body: Option<String>,
    #[source]
    cause: Option<Cause>,
}

impl ClassifiedError {
    pub(crate) fn known(
        request: &RequestSummary,
        status: StatusCode,
        message: String,
        errors: Vec<FieldError>,
        cause: Option<&Cause>,
    ) -> Self {
        Self {
            category: Category::from_status(status.as_u16()),
            resolution: Resolution::Known,
            message,
            status,
            request: request.clone(),
            errors,
            body: None,
            cause: cause.cloned(),
        }
    }

    pub(crate) fn unknown(
        request: &RequestSummary,
        status: StatusCode,
        body: String,
        cause: Option<&Cause>,
    ) -> Self {
        Self {
            category: Category::from_status(status.as_u16()),
            resolution: Resolution::Unknown,
            message: UNKNOWN_MESSAGE.to_owned(),
            status,
            request: request.clone(),
            errors: Vec::new(),
            body: Some(body),
            cause: cause.cloned(),
        }
    }

    /// Returns the status band
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns whether a message was extracted
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Returns the combined tag
    #[must_use]
    pub const fn tag(&self) -> ErrorTag {
        ErrorTag::new(self.resolution, self.category)
    }

    /// Returns `true` when a message was extracted from the body
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self.resolution, Resolution::Known)
    }

    /// Returns the human-readable message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the status code of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the request that failed
    #[must_use]
    pub const fn request(&self) -> &RequestSummary {
        &self.request
    }

    /// Returns per-field errors from a JSON `errors` map
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the raw body of an unknown error
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the error this classification was derived from
    #[must_use]
    pub const fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }
}
