//! The unified result value produced by a classified API response.
//!
//! Every request resolves to a [`Resource`]: a page (or merged pages) of
//! items, a single object, raw text, or a boolean flag. The variant is chosen
//! deterministically from the response shape, so callers can match on it
//! without re-inspecting status codes or headers.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// The classified body of a completed request.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client, Resource};
///
/// # async fn example() -> hubwire::Result<()> {
/// let client = Client::builder().build()?;
///
/// let reply = client
///     .request("/repos/rust-lang/rust/issues", CallOptions::new())
///     .await?;
///
/// match reply.resource() {
///     Resource::Items(issues) => println!("{} issues", issues.len()),
///     Resource::Object(map) => println!("single object with {} fields", map.len()),
///     Resource::Text(text) => println!("raw text: {text}"),
///     Resource::Flag(flag) => println!("flag: {flag}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// An ordered sequence of items, merged across pages in page order.
    Items(Vec<Value>),
    /// A single structured object with at least one field.
    Object(Map<String, Value>),
    /// Raw response text, used when no structured body is available.
    Text(String),
    /// A boolean flag, produced by existence-check style requests.
    Flag(bool),
}

impl Resource {
    /// Converts an arbitrary JSON value into the matching resource variant.
    ///
    /// Arrays become [`Items`](Resource::Items), objects become
    /// [`Object`](Resource::Object), booleans become [`Flag`](Resource::Flag),
    /// and everything else is rendered as [`Text`](Resource::Text)
    /// (`null` maps to the empty string). Used for caller-supplied fallback
    /// values such as `if_not_found`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Resource::Items(items),
            Value::Object(map) => Resource::Object(map),
            Value::Bool(flag) => Resource::Flag(flag),
            Value::String(text) => Resource::Text(text),
            Value::Null => Resource::Text(String::new()),
            other => Resource::Text(other.to_string()),
        }
    }

    /// Converts the resource back into a plain JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Resource::Items(items) => Value::Array(items),
            Resource::Object(map) => Value::Object(map),
            Resource::Text(text) => Value::String(text),
            Resource::Flag(flag) => Value::Bool(flag),
        }
    }

    /// Deserializes the structured value into a caller type.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubwire::Resource;
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// #[derive(Deserialize)]
    /// struct Repo {
    ///     name: String,
    /// }
    ///
    /// let resource = Resource::from_value(json!({"name": "hubwire"}));
    /// let repo: Repo = resource.decode().unwrap();
    /// assert_eq!(repo.name, "hubwire");
    /// ```
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.clone().into_value()).map_err(|e| {
            Error::DeserializationFailed {
                raw_response: self.clone().into_value().to_string(),
                serde_error: e.to_string(),
                status: http::StatusCode::OK,
            }
        })
    }

    /// Returns the items if this resource is a sequence.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Resource::Items(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the object map if this resource is a single object.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Resource::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the raw text if this resource is unstructured.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Resource::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the flag if this resource is a boolean result.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Resource::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Approximate serialized size in bytes, used as a cache weight hint
    /// when the response declares no `Content-Length`.
    pub(crate) fn size_hint(&self) -> u64 {
        match self {
            Resource::Text(text) => text.len() as u64,
            Resource::Flag(_) => 1,
            other => serde_json::to_string(&other.clone().into_value())
                .map(|s| s.len() as u64)
                .unwrap_or(1),
        }
    }
}

/// Chooses the success-path variant for a single response body.
///
/// `no_content` reflects whether the response was a bodyless success (204),
/// which is what a boolean-mode request coerces into its flag.
pub(crate) fn coerce_single(
    body: Option<Value>,
    text: String,
    boolean: bool,
    no_content: bool,
) -> Resource {
    if boolean {
        return Resource::Flag(no_content);
    }
    match body {
        Some(Value::Object(map)) if !map.is_empty() => Resource::Object(map),
        _ => Resource::Text(text),
    }
}
