use std::fmt::Write as _;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::{Cause, ClassifiedError, FieldError, KintoneError};
use crate::exchange::{Exchange, Outcome, RequestSummary, Response};

/// Message used when an HTML error page matches neither known template
pub const INVALID_AUTH_MESSAGE: &str = "Invalid auth.";

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
const HTML_CONTENT_TYPE: &str = "text/html";

/// Returns `true` if the first `Content-Type` value starts with `application/json`
#[must_use]
pub fn is_json(response: &Response) -> bool {
    response
        .content_type()
        .is_some_and(|ct| ct.starts_with(JSON_CONTENT_TYPE))
}

/// Returns `true` if the first `Content-Type` value starts with `text/html`
#[must_use]
pub fn is_html(response: &Response) -> bool {
    response
        .content_type()
        .is_some_and(|ct| ct.starts_with(HTML_CONTENT_TYPE))
}

/// Result of classifying an [`Exchange`]
#[derive(Debug)]
pub enum Verdict<'a> {
    /// Status below 300; the body was not touched
    Pass(&'a Response),
    /// Status 300 or above
    Failed(ClassifiedError),
    /// No response was received
    Transport(&'a reqwest::Error),
}

/// Turns one failed response into a [`ClassifiedError`]
///
/// Holds no state of its own; the body memo lives on the [`Response`], so
/// classifying the same response twice reads its source once.
#[derive(Debug, Clone, Copy)]
pub struct ResponseClassifier<'a> {
    request: &'a RequestSummary,
    response: &'a Response,
    cause: Option<&'a Cause>,
}

struct Extracted {
    message: String,
    errors: Vec<FieldError>,
}

impl<'a> ResponseClassifier<'a> {
    /// Creates a classifier for a request and its response
    #[must_use]
    pub const fn new(request: &'a RequestSummary, response: &'a Response) -> Self {
        Self {
            request,
            response,
            cause: None,
        }
    }

    /// Chains an existing error as the source of the classification
    #[must_use]
    pub const fn with_cause(mut self, cause: &'a Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// See [`is_json`]
    #[must_use]
    pub fn is_json(&self) -> bool {
        is_json(self.response)
    }

    /// See [`is_html`]
    #[must_use]
    pub fn is_html(&self) -> bool {
        is_html(self.response)
    }

    /// Classifies the response, or returns `None` if its status is below 300
    #[must_use]
    pub fn classify(&self) -> Option<ClassifiedError> {
        if self.response.status().as_u16() < 300 {
            return None;
        }
        Some(self.error())
    }

    /// Classifies the response regardless of its status
    ///
    /// Never fails: bodies that cannot be parsed become unknown errors.
    #[must_use]
    pub fn error(&self) -> ClassifiedError {
        let extracted = if self.is_json() {
            self.json_error()
        } else if self.is_html() {
            self.html_error()
        } else {
            None
        };

        let status = self.response.status();
        let error = match extracted {
            Some(Extracted { message, errors }) => {
                ClassifiedError::known(self.request, status, message, errors, self.cause)
            }
            None => ClassifiedError::unknown(
                self.request,
                status,
                self.response.body().text().to_owned(),
                self.cause,
            ),
        };

        debug!(
            request = %self.request,
            status = status.as_u16(),
            tag = %error.tag(),
            "classified error response"
        );
        error
    }

    fn json_error(&self) -> Option<Extracted> {
        let json: Value = match serde_json::from_str(self.response.body().text()) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "error body is not valid JSON");
                return None;
            }
        };

        let mut summary = String::new();
        let mut errors = Vec::new();
        let field_errors = json.get("errors").and_then(Value::as_object);
        if let Some(map) = field_errors {
            summary.push_str(" (");
            for (field, entry) in map {
                let _ = write!(summary, "{field} : ");
                let messages = match entry.get("messages") {
                    Some(Value::Array(items)) => {
                        let messages: Vec<String> =
                            items.iter().map(|m| text(m).unwrap_or_default()).collect();
                        for m in &messages {
                            let _ = write!(summary, "{m} ");
                        }
                        messages
                    }
                    Some(single) => {
                        let m = text(single).unwrap_or_default();
                        summary.push_str(&m);
                        vec![m]
                    }
                    None => Vec::new(),
                };
                errors.push(FieldError {
                    field: field.clone(),
                    messages,
                });
            }
            summary.push(')');
        }

        // An `errors` map makes the message present even without `message`,
        // so `reason` only applies when both are missing.
        let message = match json.get("message").and_then(text) {
            Some(message) => message + &summary,
            None if field_errors.is_some() => summary,
            None => json.get("reason").and_then(text)?,
        };
        Some(Extracted { message, errors })
    }

    fn html_error(&self) -> Option<Extracted> {
        let body = self.response.body().text();
        if body.trim().is_empty() {
            debug!("HTML error body is empty");
            return None;
        }

        let document = Html::parse_document(body);
        let message = match first_text(&document, "title").as_deref() {
            Some("Error") => first_text(&document, "h3")?,
            Some("Unauthorized") => first_text(&document, "h2")?,
            _ => INVALID_AUTH_MESSAGE.to_owned(),
        };
        Some(Extracted {
            message,
            errors: Vec::new(),
        })
    }
}

/// Strings as-is, other scalars in their JSON form, null as absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn first_text(document: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
}

impl Exchange {
    /// Classifies this exchange
    ///
    /// Calling this again yields the same verdict without re-reading the body.
    #[must_use]
    pub fn classify(&self) -> Verdict<'_> {
        match self.outcome() {
            Outcome::Failure(error) => Verdict::Transport(error),
            Outcome::Response(response) => {
                let mut classifier = ResponseClassifier::new(self.request(), response);
                if let Some(cause) = self.cause() {
                    classifier = classifier.with_cause(cause);
                }
                classifier
                    .classify()
                    .map_or(Verdict::Pass(response), Verdict::Failed)
            }
        }
    }

    /// Consumes the exchange, yielding the response or the error to raise
    ///
    /// # Errors
    ///
    /// Returns the transport failure unchanged as [`KintoneError::Http`], or
    /// the classification as [`KintoneError::Api`] for statuses of 300 and up.
    pub fn into_result(self) -> Result<Response, KintoneError> {
        let failed = match self.classify() {
            Verdict::Failed(error) => Some(error),
            Verdict::Pass(_) | Verdict::Transport(_) => None,
        };
        match (self.into_outcome(), failed) {
            (Outcome::Failure(error), _) => Err(KintoneError::Http(error)),
            (Outcome::Response(_), Some(error)) => Err(KintoneError::Api(error)),
            (Outcome::Response(response), None) => Ok(response),
        }
    }
}
