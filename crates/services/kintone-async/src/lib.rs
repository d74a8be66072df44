#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_docs)]

//! # `kintone-async`
//!
//! Response classification for kintone REST calls made with `reqwest`.
//!
//! Failed responses are turned into a [`ClassifiedError`] carrying the
//! message kintone put in the body, whether that body is a JSON error object
//! or one of the HTML error pages served in front of the API. Successful
//! responses pass through untouched.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kintone_async::{Client, KintoneConfig, KintoneError};
//!
//! # async fn example() -> Result<(), KintoneError> {
//! let config = KintoneConfig::new()
//!     .with_base_url("https://example.cybozu.com")
//!     .with_api_token("token");
//! let client = Client::with_config(config);
//!
//! match client
//!     .get::<_, serde_json::Value>("/k/v1/record.json", &[("app", "1"), ("id", "1")])
//!     .await
//! {
//!     Ok(record) => println!("{record}"),
//!     Err(KintoneError::Api(err)) => eprintln!("{} ({}): {}", err.tag(), err.status(), err),
//!     Err(other) => return Err(other),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The classifier itself is synchronous and can be driven without a client,
//! see [`ResponseClassifier`] and [`Exchange`].

/// Classification of failed responses
pub mod classify;
/// HTTP client implementation
pub mod client;
/// Configuration types for the client
pub mod config;
/// Error types
pub mod error;
/// Request/response pairs handed to the classifier
pub mod exchange;
/// Async glue between `reqwest` and the classifier
pub mod middleware;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;

pub use crate::classify::{ResponseClassifier, Verdict};
pub use crate::client::Client;
pub use crate::config::{Auth, KintoneConfig};
pub use crate::error::{Category, ClassifiedError, ErrorTag, FieldError, KintoneError, Resolution};
pub use crate::exchange::{Body, Exchange, Outcome, RequestSummary, Response};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Category, ClassifiedError, Client, ErrorTag, KintoneConfig, KintoneError, Resolution,
    };
}
