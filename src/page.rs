//! Multi-page result traversal.
//!
//! The API signals further pages through the `Link` response header. With
//! `all_pages` enabled (the default) the client follows every `rel="next"`
//! link eagerly and merges array items in page order. With it disabled, the
//! reply carries a continuation: [`Reply::next`] fetches the following page
//! on demand, and [`Reply::into_pages`] adapts the whole walk into a lazy
//! [`Stream`].

use futures::Stream;
use http::{HeaderMap, Method};
use regex::Regex;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, LazyLock};

use crate::options::ResolvedOptions;
use crate::{Client, Resource, Result};

static NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<(.+?)>;\s*rel="next""#).expect("link regex"));

/// Extracts the `rel="next"` URL from a `Link` header, if any.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("link")?.to_str().ok()?;
    NEXT_LINK.captures(raw).map(|caps| caps[1].to_string())
}

/// Everything needed to re-issue the request cycle for the next page.
pub(crate) struct PageCursor {
    pub client: Client,
    pub method: Method,
    pub url: String,
    pub options: Arc<ResolvedOptions>,
}

/// The resolved outcome of a request: a classified resource, plus a
/// continuation when the server reported a further page that was not
/// followed eagerly.
///
/// Dereferences to its [`Resource`], so replies can be inspected directly.
///
/// # Examples
///
/// ```no_run
/// use hubwire::{CallOptions, Client};
///
/// # async fn example() -> hubwire::Result<()> {
/// let client = Client::builder().build()?;
///
/// let mut reply = client
///     .request(
///         "/repos/rust-lang/rust/issues",
///         CallOptions::new().all_pages(false),
///     )
///     .await?;
///
/// loop {
///     println!("{} items on this page", reply.as_items().map_or(0, |i| i.len()));
///     match reply.next().await? {
///         Some(following) => reply = following,
///         None => break,
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Reply {
    resource: Resource,
    next: Option<PageCursor>,
}

impl Reply {
    /// A reply with no further pages.
    pub(crate) fn settled(resource: Resource) -> Self {
        Self {
            resource,
            next: None,
        }
    }

    /// A reply that can continue to the next page.
    pub(crate) fn with_next(resource: Resource, cursor: PageCursor) -> Self {
        Self {
            resource,
            next: Some(cursor),
        }
    }

    /// The classified result of this call.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Consumes the reply, returning its resource and dropping any
    /// continuation.
    pub fn into_resource(self) -> Resource {
        self.resource
    }

    /// Whether the server reported a further page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Fetches the next page through the same request/classify/paginate
    /// cycle, with identical options, credentials, and cache handling.
    ///
    /// Returns `Ok(None)` when this reply was the final page. The returned
    /// reply is itself continuable, recursively.
    pub async fn next(&self) -> Result<Option<Reply>> {
        match &self.next {
            None => Ok(None),
            Some(cursor) => cursor
                .client
                .dispatch(
                    cursor.method.clone(),
                    cursor.url.clone(),
                    Arc::clone(&cursor.options),
                )
                .await
                .map(Some),
        }
    }

    /// Adapts the walk into a lazy stream of per-page resources.
    ///
    /// The first yielded item is this reply's own resource; each further
    /// page is fetched only when the stream is polled for it. The walk is
    /// restartable only by re-issuing the original call.
    pub fn into_pages(self) -> impl Stream<Item = Result<Resource>> {
        futures::stream::try_unfold(Some(self), |state| async move {
            match state {
                None => Ok(None),
                Some(reply) => {
                    let following = reply.next().await?;
                    Ok(Some((reply.into_resource(), following)))
                }
            }
        })
    }
}

impl Deref for Reply {
    type Target = Resource;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("resource", &self.resource)
            .field("has_next", &self.next.is_some())
            .finish()
    }
}
