//! `reqwest` treats every status as a successful send, so the two hooks here
//! play the part of an error handler and a response handler around
//! `Client::execute`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::classify::{JSON_CONTENT_TYPE, ResponseClassifier};
use crate::error::{Cause, KintoneError, map_deser};
use crate::exchange::{Body, RequestSummary, Response, first_content_type};

/// Classifies the outcome of a sent request
///
/// Transport failures are returned unchanged. Responses below 300 are
/// returned with their body unread. Anything else has its body read once
/// and is classified; the transport's own status error, when it has one, is
/// chained as the cause.
///
/// # Errors
///
/// Returns [`KintoneError::Http`] for transport failures and
/// [`KintoneError::Api`] for responses with a status of 300 or more.
pub async fn on_rejected(
    request: &RequestSummary,
    result: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, KintoneError> {
    let response = result?;
    let status = response.status();
    if status.as_u16() < 300 {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let cause = response
        .error_for_status_ref()
        .err()
        .map(|e| Arc::new(e) as Cause);

    let body = match response.bytes().await {
        Ok(bytes) => Body::from(bytes),
        Err(e) => {
            warn!(error = %e, request = %request, status = status.as_u16(), "failed to read error response body");
            Body::empty()
        }
    };

    let response = Response::new(status, headers, body);
    let classifier = ResponseClassifier::new(request, &response);
    let classifier = match &cause {
        Some(cause) => classifier.with_cause(cause),
        None => classifier,
    };
    Err(KintoneError::Api(classifier.error()))
}

/// Decodes a JSON success body
///
/// # Errors
///
/// Returns [`KintoneError::Serde`] if the content type is not JSON or the
/// body does not match `O`, and [`KintoneError::Http`] if the body cannot be
/// read.
pub async fn decode_json<O: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<O, KintoneError> {
    let content_type = first_content_type(response.headers())
        .unwrap_or_default()
        .to_owned();
    if !content_type.starts_with(JSON_CONTENT_TYPE) {
        return Err(KintoneError::Serde(format!(
            "expected a JSON response, got content type '{content_type}'"
        )));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| map_deser(&e, &bytes))
}
