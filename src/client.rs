//! The request-orchestration client.
//!
//! [`Client`] is the main entry point. One [`request`](Client::request) call
//! resolves options, interpolates the path template, consults the cache,
//! issues the HTTP round-trip(s), follows pagination, and classifies the
//! outcome into a single [`Resource`] (or a lazily-continuable [`Reply`]).
//! Use [`ClientBuilder`] to configure instance-level option defaults.

use futures::FutureExt;
use http::{header, HeaderMap, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    cache::{CacheEntry, CachedPage, CacheStore, InFlight},
    options::{resolve, CallOptions, ResolvedOptions},
    page::{next_link, PageCursor, Reply},
    resource::coerce_single,
    telemetry::Telemetry,
    template::{interpolate, resolve_path},
    Error, Resource, Result,
};

/// A client for issuing orchestrated API calls.
///
/// The client is designed to be reused: it owns a connection pool, the
/// instance-level option defaults, and a [`Telemetry`] handle updated after
/// every completed request. Cloning is cheap and clones share all of these.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client};
///
/// # async fn example() -> hubwire::Result<()> {
/// let client = Client::builder()
///     .token("ghp_secret")
///     .user_agent("my-app/1.0")
///     .build()?;
///
/// // Fetch a single resource.
/// let repo = client
///     .request(
///         "/repos/:owner/:repo",
///         CallOptions::new().var("owner", "rust-lang").var("repo", "rust"),
///     )
///     .await?;
/// println!("full name: {:?}", repo.as_object().unwrap()["full_name"]);
///
/// // The template shorthand can select the method.
/// let body = serde_json::json!({"title": "An issue"});
/// client
///     .request(
///         "POST /repos/:owner/:repo/issues",
///         CallOptions::new()
///             .var("owner", "rust-lang")
///             .var("repo", "rust")
///             .body(&body)?,
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    defaults: CallOptions,
    telemetry: Telemetry,
}

/// A completed transport round-trip, before classification.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
    text: String,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The telemetry handle this client reports into.
    pub fn telemetry(&self) -> &Telemetry {
        &self.inner.telemetry
    }

    /// Issues an orchestrated request.
    ///
    /// `path` is a template, optionally prefixed with a `"METHOD "` shorthand
    /// that overrides the configured method. Placeholders (`:name` or
    /// `{dotted.path}`) are substituted from the merged option variables; a
    /// missing variable fails before any network I/O. Relative paths are
    /// prefixed with the configured host.
    ///
    /// Multi-page array responses are merged eagerly by default; pass
    /// `CallOptions::new().all_pages(false)` to page lazily through
    /// [`Reply::next`] instead.
    pub async fn request(&self, path: &str, options: CallOptions) -> Result<Reply> {
        let mut resolved = resolve(&options, &self.inner.defaults)?;
        let target = resolve_path(path, &resolved)?;
        if let Some(method) = target.method {
            resolved.method = method;
        }
        let method = resolved.method.clone();
        self.dispatch(method, target.url, Arc::new(resolved)).await
    }

    /// Interpolates a template against the merged options without issuing a
    /// request.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubwire::{CallOptions, Client};
    ///
    /// # fn example() -> hubwire::Result<()> {
    /// let client = Client::builder().build()?;
    /// let path = client.interpolate(
    ///     "/repos/:owner/:repo",
    ///     &CallOptions::new().var("owner", "a").var("repo", "b"),
    /// )?;
    /// assert_eq!(path, "/repos/a/b");
    /// # Ok(())
    /// # }
    /// ```
    pub fn interpolate(&self, template: &str, options: &CallOptions) -> Result<String> {
        let resolved = resolve(options, &self.inner.defaults)?;
        interpolate(template, &resolved.vars)
    }

    /// Runs one request cycle against an already-resolved URL.
    ///
    /// This is the continuation target for lazy pagination as well, so every
    /// page goes through identical cache and classification handling.
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: String,
        options: Arc<ResolvedOptions>,
    ) -> Result<Reply> {
        if method == Method::GET && options.immutable {
            if let Some(cache) = options.cache.clone() {
                match cache.get(&url).await {
                    Some(CacheEntry::Settled(page)) => {
                        tracing::debug!(url = %url, "Serving immutable GET from cache");
                        return Ok(Reply::settled(page.value));
                    }
                    Some(CacheEntry::Pending(in_flight)) => {
                        tracing::debug!(url = %url, "Joining in-flight immutable GET");
                        return in_flight
                            .outcome()
                            .await
                            .map(Reply::settled)
                            .map_err(Error::Shared);
                    }
                    None => {}
                }
                return self.single_flight(method, url, options, cache).await;
            }
        }
        self.paginate(method, url, options).await
    }

    /// Dispatches an immutable GET as a shared, pinned in-flight operation.
    async fn single_flight(
        &self,
        method: Method,
        url: String,
        options: Arc<ResolvedOptions>,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Reply> {
        let future = {
            let client = self.clone();
            let url = url.clone();
            async move {
                client
                    .paginate(method, url, options)
                    .await
                    .map(Reply::into_resource)
                    .map_err(Arc::new)
            }
        }
        .boxed()
        .shared();

        // Pin the in-flight outcome before the round-trip completes so that
        // concurrent identical GETs collapse onto it instead of dispatching
        // their own network calls.
        cache
            .set(&url, CacheEntry::Pending(InFlight::new(future.clone())))
            .await;

        match future.await {
            Ok(resource) => {
                // The pagination cycle stored a settled entry itself if the
                // response carried an ETag. Otherwise the placeholder must be
                // replaced here, or later immutable GETs would refetch.
                match cache.get(&url).await {
                    Some(CacheEntry::Settled(_)) => {}
                    _ => {
                        let size = resource.size_hint();
                        cache
                            .set(
                                &url,
                                CacheEntry::settled(
                                    resource.clone(),
                                    None,
                                    StatusCode::OK.as_u16(),
                                    size,
                                ),
                            )
                            .await;
                    }
                }
                Ok(Reply::settled(resource))
            }
            Err(error) => {
                cache.remove(&url).await;
                Err(Error::Shared(error))
            }
        }
    }

    /// The request/classify/paginate cycle.
    ///
    /// Pages are fetched strictly in server-declared order; array items are
    /// appended across pages. A failure on any page rejects the whole
    /// operation.
    async fn paginate(
        &self,
        method: Method,
        url: String,
        options: Arc<ResolvedOptions>,
    ) -> Result<Reply> {
        // Fresh responses are stored under the originally resolved URL even
        // while paging, so a revalidation of that URL serves the merged value.
        let cache_key = url.clone();
        let mut current_url = url;
        let mut items: Vec<Value> = Vec::new();

        loop {
            // Pin the cached value now: the store may evict it mid-request,
            // and a 304 must still be able to serve it.
            let pinned = self.check_cache(&method, &current_url, &options).await;
            let response = self
                .execute(&method, &current_url, &options, pinned.as_ref())
                .await?;

            if response.status == StatusCode::NOT_MODIFIED {
                return match pinned {
                    Some(page) => Ok(Reply::settled(page.value)),
                    None => Err(Error::NotModifiedWithoutCache { url: current_url }),
                };
            }

            if let Some(resource) = classify_failure(&response, &options)? {
                return Ok(Reply::settled(resource));
            }

            let RawResponse {
                status,
                headers,
                mut body,
                text,
            } = response;

            // Some endpoints return JSON as raw text while declaring the
            // format only through the media-type marker header.
            if body.is_none() && !text.is_empty() && media_declares_json(&headers) {
                body = Some(serde_json::from_str(&text).map_err(|e| {
                    Error::DeserializationFailed {
                        raw_response: text.clone(),
                        serde_error: e.to_string(),
                        status,
                    }
                })?);
            }

            let resource = match body {
                Some(Value::Array(page_items)) => {
                    items.extend(page_items);
                    Resource::Items(items.clone())
                }
                other => coerce_single(
                    other,
                    text.clone(),
                    options.boolean,
                    status == StatusCode::NO_CONTENT,
                ),
            };

            self.store_fresh(&cache_key, &resource, status, &headers, &options, text.len())
                .await;

            match next_link(&headers) {
                Some(next_url) if options.all_pages => {
                    tracing::debug!(next = %next_url, "Following pagination link");
                    current_url = next_url;
                }
                Some(next_url) => {
                    return Ok(Reply::with_next(
                        resource,
                        PageCursor {
                            client: self.clone(),
                            method,
                            url: next_url,
                            options,
                        },
                    ));
                }
                None => return Ok(Reply::settled(resource)),
            }
        }
    }

    /// Looks up the settled cache entry a conditional GET can revalidate.
    async fn check_cache(
        &self,
        method: &Method,
        url: &str,
        options: &ResolvedOptions,
    ) -> Option<CachedPage> {
        if *method != Method::GET {
            return None;
        }
        let cache = options.cache.as_ref()?;
        match cache.get(url).await {
            Some(CacheEntry::Settled(page)) => Some(page),
            _ => None,
        }
    }

    /// Stores a fresh, revalidatable response under the original URL.
    async fn store_fresh(
        &self,
        cache_key: &str,
        resource: &Resource,
        status: StatusCode,
        headers: &HeaderMap,
        options: &ResolvedOptions,
        text_len: usize,
    ) {
        if status != StatusCode::OK {
            return;
        }
        let Some(cache) = options.cache.as_ref() else {
            return;
        };
        let Some(etag) = headers.get(header::ETAG).and_then(|v| v.to_str().ok()) else {
            return;
        };
        let size = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(text_len as u64);
        cache
            .set(
                cache_key,
                CacheEntry::settled(
                    resource.clone(),
                    Some(etag.to_string()),
                    status.as_u16(),
                    size,
                ),
            )
            .await;
    }

    /// Executes a single transport round-trip.
    async fn execute(
        &self,
        method: &Method,
        url: &str,
        options: &ResolvedOptions,
        pinned: Option<&CachedPage>,
    ) -> Result<RawResponse> {
        tracing::debug!(method = %method, url = %url, "Executing HTTP request");

        let mut request = self.inner.http_client.request(method.clone(), url);

        if let Some(token) = &options.token {
            request = request.header(header::AUTHORIZATION, format!("token {token}"));
        } else if let (Some(username), Some(password)) = (&options.username, &options.password) {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(user_agent) = &options.user_agent {
            request = request.header(header::USER_AGENT, user_agent.as_str());
        }
        if let Some(media) = &options.media {
            request = request.header(header::ACCEPT, format!("application/vnd.github.{media}"));
        }
        request = request.query(&[("per_page", options.per_page.to_string())]);

        if let Some(etag) = pinned.and_then(|page| page.etag.as_deref()) {
            request = request.header(header::IF_NONE_MATCH, etag);
        }
        if options.cache.is_none() {
            // Some transports cache GETs on their own when no validator is
            // sent, which would bypass the conditional-request logic.
            request = request.header(header::IF_MODIFIED_SINCE, "Sat, 1 Jan 2000 00:00:00 GMT");
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                self.inner.telemetry.record(None);
                return Err(Error::Network(error));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        self.inner.telemetry.record(Some(&headers));

        tracing::info!(
            status = status.as_u16(),
            url = %url,
            "Received HTTP response"
        );

        let text = response.text().await.map_err(Error::Network)?;
        let body = parse_body(&headers, &text);

        Ok(RawResponse {
            status,
            headers,
            body,
            text,
        })
    }
}

/// Absorbs whitelisted non-success statuses, or fails with an aggregated
/// API error.
///
/// Returns `Ok(None)` for successful statuses, `Ok(Some(resource))` when a
/// whitelist rule produced a result, and `Err` otherwise.
fn classify_failure(
    response: &RawResponse,
    options: &ResolvedOptions,
) -> Result<Option<Resource>> {
    let status = response.status;
    if status.is_success() {
        return Ok(None);
    }

    let message = response
        .body
        .as_ref()
        .and_then(|body| body.get("message"))
        .and_then(Value::as_str);

    // Existence checks answer "no" as a 404 with this exact message.
    if options.boolean && status == StatusCode::NOT_FOUND && message == Some("Not Found") {
        return Ok(Some(Resource::Flag(false)));
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(fallback) = &options.if_not_found {
            return Ok(Some(Resource::from_value(fallback.clone())));
        }
    }

    let errors: Vec<String> = response
        .body
        .as_ref()
        .and_then(|body| body.get("errors"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    tracing::warn!(
        status = status.as_u16(),
        detail = message.unwrap_or_default(),
        "API error"
    );

    Err(Error::Api {
        status,
        message: message.unwrap_or_default().to_string(),
        errors,
    })
}

/// Parses the body as JSON when the response declares a JSON content type.
fn parse_body(headers: &HeaderMap, text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    if content_type.starts_with("application/json") || content_type.contains("+json") {
        serde_json::from_str(text).ok()
    } else {
        None
    }
}

/// Whether the media-type marker header declares a JSON payload.
fn media_declares_json(headers: &HeaderMap) -> bool {
    headers
        .get("x-github-media-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("format=json"))
}

/// Builder for configuring and creating a [`Client`].
///
/// Instance-level settings become the middle layer of the option merge:
/// per-call options override them, and they override the library defaults.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client, ClientBuilder};
///
/// # fn example() -> hubwire::Result<()> {
/// let client = ClientBuilder::new()
///     .host("https://ghe.example.com/api/v3")?
///     .token("ghp_secret")
///     .user_agent("my-app/1.0")
///     .per_page(50)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    defaults: CallOptions,
    telemetry: Option<Telemetry>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with empty instance defaults.
    pub fn new() -> Self {
        Self {
            defaults: CallOptions::new(),
            telemetry: None,
        }
    }

    /// Replaces the instance-level option defaults wholesale.
    pub fn defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the base URL requests are issued against.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL.
    pub fn host(mut self, host: impl AsRef<str>) -> Result<Self> {
        self.defaults = self.defaults.host(host)?;
        Ok(self)
    }

    /// Sets the OAuth token used by every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.defaults = self.defaults.token(token);
        self
    }

    /// Sets the basic-auth username used when no token is configured.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.defaults = self.defaults.username(username);
        self
    }

    /// Sets the basic-auth password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.defaults = self.defaults.password(password);
        self
    }

    /// Sets the `User-Agent` header sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.defaults = self.defaults.user_agent(user_agent);
        self
    }

    /// Sets the default page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.defaults = self.defaults.per_page(per_page);
        self
    }

    /// Shares an existing telemetry handle instead of creating a fresh one.
    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                defaults: self.defaults,
                telemetry: self.telemetry.unwrap_or_default(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
