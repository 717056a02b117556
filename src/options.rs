//! Request options and the three-layer option merge.
//!
//! Options merge by "first writer wins": per-call options override the
//! client's instance defaults, which override the library defaults. The merge
//! produces one flattened, immutable [`ResolvedOptions`] per call; nothing is
//! mutated after that point.

use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::{default_cache, CacheStore};
use crate::template::parse_method;
use crate::{Error, Result};

/// The default API root requests are issued against.
pub const DEFAULT_HOST: &str = "https://api.github.com";

/// The default page size attached to every request.
pub const DEFAULT_PER_PAGE: u32 = 100;

const DEFAULT_USER_AGENT: &str = concat!("hubwire/", env!("CARGO_PKG_VERSION"));

/// Where cache lookups and writes for a call should go.
///
/// Absent from a layer, the choice falls through to the next one; the library
/// default is a process-wide in-memory store shared by every client that does
/// not configure its own.
#[derive(Clone)]
pub enum CacheChoice {
    /// Disable caching for this call entirely.
    Disabled,
    /// Use the given store.
    Store(Arc<dyn CacheStore>),
}

impl fmt::Debug for CacheChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheChoice::Disabled => f.write_str("Disabled"),
            CacheChoice::Store(_) => f.write_str("Store(..)"),
        }
    }
}

/// Partial request configuration for a single call (or a client's defaults).
///
/// Every recognized option is optional; unset options fall through to the
/// next layer. Template variables set with [`var`](CallOptions::var) pass
/// through the merge untouched and are resolved by the path templater.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client};
///
/// # async fn example() -> hubwire::Result<()> {
/// let client = Client::builder().token("ghp_secret").build()?;
///
/// let issues = client
///     .request(
///         "/repos/:owner/:repo/issues",
///         CallOptions::new()
///             .var("owner", "rust-lang")
///             .var("repo", "rust")
///             .per_page(50),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) method: Option<String>,
    pub(crate) host: Option<String>,
    pub(crate) per_page: Option<u32>,
    pub(crate) all_pages: Option<bool>,
    pub(crate) cache: Option<CacheChoice>,
    pub(crate) immutable: Option<bool>,
    pub(crate) token: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) media: Option<String>,
    pub(crate) body: Option<Value>,
    pub(crate) boolean: Option<bool>,
    pub(crate) if_not_found: Option<Value>,
    pub(crate) vars: BTreeMap<String, Value>,
}

impl CallOptions {
    /// Creates an empty option set; every field falls through to the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method. Case-insensitive; a `"METHOD path"` template
    /// shorthand overrides this.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the base URL prefix for relative paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL.
    pub fn host(mut self, host: impl AsRef<str>) -> Result<Self> {
        url::Url::parse(host.as_ref())?;
        self.host = Some(host.as_ref().trim_end_matches('/').to_string());
        Ok(self)
    }

    /// Sets the page size requested from the API.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Controls whether multi-page responses are followed eagerly.
    ///
    /// Defaults to `true`. When `false`, the reply exposes a continuation for
    /// fetching further pages on demand.
    pub fn all_pages(mut self, all_pages: bool) -> Self {
        self.all_pages = Some(all_pages);
        self
    }

    /// Uses the given cache store for this call.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(CacheChoice::Store(store));
        self
    }

    /// Disables caching for this call.
    pub fn no_cache(mut self) -> Self {
        self.cache = Some(CacheChoice::Disabled);
        self
    }

    /// Marks GETs as immutable: served from cache without revalidation and
    /// de-duplicated across concurrent identical requests.
    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = Some(immutable);
        self
    }

    /// Sets an OAuth token, attached as `Authorization: token <token>`.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the basic-auth username. Used only when no token is set and a
    /// password is also present.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the basic-auth password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets a custom accept-type suffix (`Accept: application/vnd.github.<media>`).
    pub fn media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    /// Sets the request payload, serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn body(mut self, body: &impl Serialize) -> Result<Self> {
        self.body =
            Some(serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?);
        Ok(self)
    }

    /// Treats the response as a true/false flag rather than data.
    ///
    /// A bodyless success resolves `true`; a 404 with a `"Not Found"` message
    /// resolves `false` instead of failing. This is the API's convention for
    /// existence checks.
    pub fn boolean(mut self, boolean: bool) -> Self {
        self.boolean = Some(boolean);
        self
    }

    /// Supplies a fallback value resolved instead of failing on a 404.
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback cannot be serialized.
    pub fn if_not_found(mut self, fallback: &impl Serialize) -> Result<Self> {
        self.if_not_found = Some(
            serde_json::to_value(fallback).map_err(|e| Error::SerializationFailed(e.to_string()))?,
        );
        Ok(self)
    }

    /// Binds a template variable used by path interpolation.
    ///
    /// Structured values can be bound too; dotted placeholders like
    /// `{issue.number}` descend into them.
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

/// One call's fully-merged, immutable configuration.
pub(crate) struct ResolvedOptions {
    pub method: Method,
    pub host: String,
    pub per_page: u32,
    pub all_pages: bool,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub immutable: bool,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
    pub media: Option<String>,
    pub body: Option<Value>,
    pub boolean: bool,
    pub if_not_found: Option<Value>,
    pub vars: BTreeMap<String, Value>,
}

/// Merges the three option layers into one flattened configuration.
///
/// For every recognized key the value is the first of (per-call, instance
/// defaults, library defaults) that defines it. Template variables merge
/// per-key with the same precedence.
pub(crate) fn resolve(call: &CallOptions, instance: &CallOptions) -> Result<ResolvedOptions> {
    let method_name = call
        .method
        .clone()
        .or_else(|| instance.method.clone())
        .unwrap_or_else(|| "get".to_string());

    let cache = match call.cache.clone().or_else(|| instance.cache.clone()) {
        Some(CacheChoice::Disabled) => None,
        Some(CacheChoice::Store(store)) => Some(store),
        None => Some(default_cache()),
    };

    let mut vars = call.vars.clone();
    for (name, value) in &instance.vars {
        vars.entry(name.clone()).or_insert_with(|| value.clone());
    }

    Ok(ResolvedOptions {
        method: parse_method(&method_name)?,
        host: call
            .host
            .clone()
            .or_else(|| instance.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        per_page: call
            .per_page
            .or(instance.per_page)
            .unwrap_or(DEFAULT_PER_PAGE),
        all_pages: call.all_pages.or(instance.all_pages).unwrap_or(true),
        cache,
        immutable: call.immutable.or(instance.immutable).unwrap_or(false),
        token: call.token.clone().or_else(|| instance.token.clone()),
        username: call.username.clone().or_else(|| instance.username.clone()),
        password: call.password.clone().or_else(|| instance.password.clone()),
        user_agent: call
            .user_agent
            .clone()
            .or_else(|| instance.user_agent.clone())
            .or_else(|| Some(DEFAULT_USER_AGENT.to_string())),
        media: call.media.clone().or_else(|| instance.media.clone()),
        body: call.body.clone().or_else(|| instance.body.clone()),
        boolean: call.boolean.or(instance.boolean).unwrap_or(false),
        if_not_found: call
            .if_not_found
            .clone()
            .or_else(|| instance.if_not_found.clone()),
        vars,
    })
}

#[cfg(test)]
impl ResolvedOptions {
    /// A resolved option set with the variables the template tests expect.
    pub(crate) fn for_tests() -> Self {
        let call = CallOptions::new().var("owner", "a").var("repo", "b");
        resolve(&call, &CallOptions::new()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_defaults() {
        let resolved = resolve(&CallOptions::new(), &CallOptions::new()).unwrap();
        assert_eq!(resolved.method, Method::GET);
        assert_eq!(resolved.host, DEFAULT_HOST);
        assert_eq!(resolved.per_page, 100);
        assert!(resolved.all_pages);
        assert!(!resolved.immutable);
        assert!(!resolved.boolean);
        assert!(resolved.cache.is_some());
        assert!(resolved.user_agent.unwrap().starts_with("hubwire/"));
    }

    #[test]
    fn test_call_overrides_instance_overrides_defaults() {
        let instance = CallOptions::new().per_page(42).token("instance-token");
        let call = CallOptions::new().per_page(7);

        let resolved = resolve(&call, &instance).unwrap();
        assert_eq!(resolved.per_page, 7);
        // Unset at call level: falls through to the instance layer.
        assert_eq!(resolved.token.as_deref(), Some("instance-token"));
    }

    #[test]
    fn test_method_normalized_to_upper_case() {
        let resolved =
            resolve(&CallOptions::new().method("post"), &CallOptions::new()).unwrap();
        assert_eq!(resolved.method, Method::POST);
    }

    #[test]
    fn test_invalid_method_is_a_configuration_error() {
        let result = resolve(&CallOptions::new().method("not a verb"), &CallOptions::new());
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_cache_disabled_wins_over_default() {
        let resolved = resolve(&CallOptions::new().no_cache(), &CallOptions::new()).unwrap();
        assert!(resolved.cache.is_none());
    }

    #[test]
    fn test_vars_merge_per_key() {
        let instance = CallOptions::new().var("owner", "default-owner").var("repo", "r");
        let call = CallOptions::new().var("owner", "override");

        let resolved = resolve(&call, &instance).unwrap();
        assert_eq!(resolved.vars.get("owner"), Some(&json!("override")));
        assert_eq!(resolved.vars.get("repo"), Some(&json!("r")));
    }

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let call = CallOptions::new().host("https://ghe.example.com/").unwrap();
        let resolved = resolve(&call, &CallOptions::new()).unwrap();
        assert_eq!(resolved.host, "https://ghe.example.com");
    }
}
