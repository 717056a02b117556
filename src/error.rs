//! Error types for API calls.
//!
//! This module provides comprehensive error types that preserve maximum debugging information
//! while remaining ergonomic to use. All errors include context about what went wrong and
//! provide access to raw response data when available.

use http::StatusCode;
use std::sync::Arc;

/// The main error type for API calls.
///
/// This error type preserves all relevant debugging information including raw responses,
/// HTTP status codes, and per-field error details reported by the API.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
///
/// let call = CallOptions::new().var("owner", "rust-lang").var("repo", "rust");
/// match client.request("/repos/:owner/:repo", call).await {
///     Ok(reply) => println!("Fetched: {:?}", reply.resource()),
///     Err(Error::Api { status, message, .. }) => {
///         eprintln!("API rejected the request ({status}): {message}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    ///
    /// This wraps the underlying `reqwest::Error` and indicates problems at the network layer
    /// rather than the HTTP protocol layer.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A path template referenced a variable that no option layer provides.
    ///
    /// Raised synchronously, before any network call is issued.
    ///
    /// # Fields
    ///
    /// * `variable` - The placeholder (possibly dotted) that could not be resolved
    /// * `template` - The original template string, for context
    #[error("Options missing variable \"{variable}\" for path \"{template}\"")]
    Template {
        /// The placeholder that could not be resolved
        variable: String,
        /// The template the placeholder appeared in
        template: String,
    },

    /// The API returned a non-success status that no whitelist rule absorbed.
    ///
    /// The message aggregates the primary `message` field of the response body
    /// and any nested per-field error messages.
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code
    /// * `message` - The body's top-level message, if any
    /// * `errors` - Nested `errors[].message` entries from the body
    #[error("GitHub error {status}: {message}{}", format_sub_errors(.errors))]
    Api {
        /// The HTTP status code
        status: StatusCode,
        /// The body's top-level message field
        message: String,
        /// Messages from the body-level error list
        errors: Vec<String>,
    },

    /// The server answered 304 Not Modified but no cached copy was pinned.
    ///
    /// This can only happen if the cache store evicted the entry between the
    /// conditional lookup and the response, or if an intermediary injected the
    /// 304 on its own.
    #[error("Received 304 Not Modified for \"{url}\" but no cached copy is available")]
    NotModifiedWithoutCache {
        /// The request URL that produced the unexpected 304
        url: String,
    },

    /// Failed to deserialize the response body into JSON.
    ///
    /// This error preserves both the raw response text and the serde error message,
    /// making it easy to debug deserialization issues in production.
    ///
    /// # Fields
    ///
    /// * `raw_response` - The raw response body as a string
    /// * `serde_error` - The error message from serde
    /// * `status` - The HTTP status code of the response
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided.
    ///
    /// This indicates a problem with how the client or request was configured,
    /// such as an invalid method name or an unusable host.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    ///
    /// This occurs when the request body cannot be serialized to JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    ///
    /// This wraps URL parsing errors.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The failure of an in-flight request this call piggybacked on.
    ///
    /// Immutable GETs for the same URL collapse onto a single network
    /// operation; every caller that joined it observes the same underlying
    /// error through this shared handle.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    ///
    /// Returns `Some(status)` for `Api` and `DeserializationFailed` errors
    /// (looking through `Shared`), `None` for other error types.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Shared(inner) => inner.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            Error::Shared(inner) => inner.raw_response(),
            _ => None,
        }
    }
}

/// Renders the parenthesized sub-error suffix of an [`Error::Api`] message.
fn format_sub_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(" ({})", errors.join(", "))
    }
}

/// A specialized `Result` type for API calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
