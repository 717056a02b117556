//! Rate-limit and authorization-scope tracking with automatic header parsing.
//!
//! Every completed request updates a shared [`Telemetry`] handle from the
//! response headers, so applications can inspect the most recently observed
//! rate-limit ceiling, remaining quota, and granted OAuth scopes at any time
//! without issuing an extra call.

use http::HeaderMap;
use std::sync::{Arc, RwLock};

/// The last-known rate-limit and scope data, captured after a request.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client};
///
/// # async fn example() -> hubwire::Result<()> {
/// let client = Client::builder().build()?;
/// client.request("/rate_limit", CallOptions::new()).await?;
///
/// let snapshot = client.telemetry().snapshot();
/// if let Some(remaining) = snapshot.rate_limit_remaining {
///     println!("{remaining} requests left in this window");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// The rate-limit ceiling (`x-ratelimit-limit`), or unknown.
    pub rate_limit: Option<u64>,

    /// Requests remaining in the current window (`x-ratelimit-remaining`), or unknown.
    pub rate_limit_remaining: Option<u64>,

    /// OAuth scopes granted to the current credentials (`x-oauth-scopes`).
    ///
    /// Not every response reports scopes; the last known set is retained
    /// whenever the header is absent.
    pub oauth_scopes: Vec<String>,
}

/// Shared, thread-safe telemetry state.
///
/// Cloning is cheap; clones observe the same underlying snapshot. One handle
/// is created per [`Client`](crate::Client), and a handle can be shared
/// across clients through [`ClientBuilder::telemetry`](crate::ClientBuilder::telemetry).
///
/// Updates are last-write-wins: if two responses complete out of order, the
/// snapshot reflects whichever wrote last.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    inner: Arc<RwLock<TelemetrySnapshot>>,
}

impl Telemetry {
    /// Creates a fresh handle with an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.read().expect("telemetry lock poisoned").clone()
    }

    /// The last observed rate-limit ceiling, if any.
    pub fn rate_limit(&self) -> Option<u64> {
        self.snapshot().rate_limit
    }

    /// The last observed remaining request count, if any.
    pub fn rate_limit_remaining(&self) -> Option<u64> {
        self.snapshot().rate_limit_remaining
    }

    /// The last observed OAuth scope list.
    pub fn oauth_scopes(&self) -> Vec<String> {
        self.snapshot().oauth_scopes
    }

    /// Records the outcome of a completed transport round-trip.
    ///
    /// `headers` is `None` when the request failed before a response arrived;
    /// limit and remaining are then cleared (their true values are unknown),
    /// while the scope list keeps its last known value.
    pub(crate) fn record(&self, headers: Option<&HeaderMap>) {
        let mut snapshot = self.inner.write().expect("telemetry lock poisoned");
        snapshot.rate_limit = headers.and_then(|h| parse_u64_header(h, "x-ratelimit-limit"));
        snapshot.rate_limit_remaining =
            headers.and_then(|h| parse_u64_header(h, "x-ratelimit-remaining"));
        if let Some(scopes) = headers.and_then(parse_oauth_scopes) {
            snapshot.oauth_scopes = scopes;
        }
    }
}

/// Parses an integer-valued header.
fn parse_u64_header(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Parses the `x-oauth-scopes` header into an ordered scope list.
fn parse_oauth_scopes(headers: &HeaderMap) -> Option<Vec<String>> {
    let raw = headers.get("x-oauth-scopes")?.to_str().ok()?;
    Some(
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
