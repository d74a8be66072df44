use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};

use crate::error::Cause;

/// The parts of an outbound request kept alongside its response
///
/// `reqwest::Request` cannot be cloned once it carries a streaming body, so
/// only the method and URL travel with a classified error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    method: Method,
    url: String,
}

impl RequestSummary {
    /// Creates a summary from a method and URL
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Captures the method and URL of a built request
    #[must_use]
    pub fn from_request(request: &reqwest::Request) -> Self {
        Self::new(request.method().clone(), request.url().as_str())
    }

    /// Returns the request method
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

type Source = Box<dyn Read + Send>;

/// A response body that is read from its source at most once
///
/// The first call to [`Body::text`] drains the source and memoizes the
/// decoded text; later calls return the memo. A source that fails mid-read
/// keeps whatever was read before the failure.
pub struct Body {
    source: Mutex<Option<Source>>,
    text: OnceLock<String>,
}

impl Body {
    /// Wraps a single-read source
    #[must_use]
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            source: Mutex::new(Some(Box::new(reader))),
            text: OnceLock::new(),
        }
    }

    /// A body with no content
    #[must_use]
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// Returns the body as text, reading the source on first use
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            // A poisoned slot still holds an untouched source.
            let slot = self
                .source
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let Some(mut source) = slot else {
                return String::new();
            };
            let mut buf = Vec::new();
            if let Err(e) = source.read_to_end(&mut buf) {
                tracing::warn!(error = %e, read = buf.len(), "failed to read response body");
            }
            String::from_utf8_lossy(&buf).into_owned()
        })
    }

    /// Whether the source has already been drained
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.text.get().is_some()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text.get() {
            Some(text) => f.debug_struct("Body").field("text", text).finish(),
            None => f.debug_struct("Body").field("text", &"<unread>").finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

/// Status line, headers and body of a received response
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// Creates a response from its parts
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the first `Content-Type` value, if it is valid text
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        first_content_type(&self.headers)
    }
}

/// Only the first `Content-Type` entry counts; repeated headers are ignored.
pub(crate) fn first_content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// What came back for a request
#[derive(Debug)]
pub enum Outcome {
    /// The server answered, with any status
    Response(Response),
    /// The transport failed before a response was received
    Failure(reqwest::Error),
}

/// One outbound request paired with its response or transport failure
#[derive(Debug)]
pub struct Exchange {
    request: RequestSummary,
    outcome: Outcome,
    cause: Option<Cause>,
}

impl Exchange {
    /// Pairs a request with its outcome
    #[must_use]
    pub const fn new(request: RequestSummary, outcome: Outcome) -> Self {
        Self {
            request,
            outcome,
            cause: None,
        }
    }

    /// Pairs a request with the response it received
    #[must_use]
    pub const fn response(request: RequestSummary, response: Response) -> Self {
        Self::new(request, Outcome::Response(response))
    }

    /// Pairs a request with the transport failure it ran into
    #[must_use]
    pub const fn failure(request: RequestSummary, error: reqwest::Error) -> Self {
        Self::new(request, Outcome::Failure(error))
    }

    /// Attaches an error already raised for this exchange
    ///
    /// It is chained as the source of any classified error.
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Returns the request side
    #[must_use]
    pub const fn request(&self) -> &RequestSummary {
        &self.request
    }

    /// Returns the outcome
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the attached cause, if any
    #[must_use]
    pub const fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub(crate) fn into_outcome(self) -> Outcome {
        self.outcome
    }
}
