//! # Hubwire - a request-orchestration client for the GitHub REST API
//!
//! Hubwire turns a single logical "fetch this resource" call into a correctly
//! authenticated, conditionally cached, possibly multi-page HTTP interaction,
//! and hands back one unified result value. It is built on top of `reqwest`
//! and works against api.github.com or any API-compatible host.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hubwire::{CallOptions, Client, Resource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hubwire::Error> {
//!     let client = Client::builder()
//!         .token("ghp_secret")
//!         .user_agent("my-app/1.0")
//!         .build()?;
//!
//!     // Path templates substitute :name and {dotted.path} placeholders from
//!     // the call's variables, and may carry a "METHOD path" shorthand.
//!     let issues = client
//!         .request(
//!             "/repos/:owner/:repo/issues",
//!             CallOptions::new().var("owner", "rust-lang").var("repo", "rust"),
//!         )
//!         .await?;
//!
//!     // Multi-page array responses are merged eagerly by default.
//!     if let Resource::Items(items) = issues.resource() {
//!         println!("{} issues across all pages", items.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **One entry point** - a path template plus options; the engine resolves
//!   method, URL, credentials, caching, and pagination
//! - **Conditional caching** - 200 responses with ETags are cached and
//!   revalidated with `If-None-Match`; a 304 is served locally
//! - **Immutable GETs** - resources that never change are served from cache
//!   without revalidation, and concurrent identical requests collapse onto a
//!   single in-flight operation
//! - **Eager or lazy pagination** - merge every page into one sequence, or
//!   walk pages on demand through a continuation or a `Stream`
//! - **Classified results** - a tagged [`Resource`] (items, object, text, or
//!   flag) chosen deterministically from the response shape
//! - **Rate-limit telemetry** - the most recent rate-limit ceiling, remaining
//!   quota, and OAuth scopes, readable at any time
//! - **Structured logging** - request/response tracing via `tracing`
//!
//! ## Caching
//!
//! Every client shares a process-wide, size-bounded in-memory store unless a
//! call configures its own (or disables caching):
//!
//! ```no_run
//! use hubwire::{cache::MemoryCache, CallOptions, Client};
//! use std::sync::Arc;
//!
//! # async fn example() -> hubwire::Result<()> {
//! let client = Client::builder().build()?;
//! let store = Arc::new(MemoryCache::new(1_000_000));
//!
//! // Gists are keyed by revision and never change: serve them from cache
//! // forever and de-duplicate concurrent fetches.
//! let gist = client
//!     .request(
//!         "/gists/:id/:sha",
//!         CallOptions::new()
//!             .var("id", "aa5a315d61ae9438b18d")
//!             .var("sha", "abc123")
//!             .cache_store(store)
//!             .immutable(true),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Existence checks
//!
//! Some endpoints answer a yes/no question with a bodyless success or a 404.
//! Boolean mode classifies both as a flag instead of data or an error:
//!
//! ```no_run
//! use hubwire::{CallOptions, Client};
//!
//! # async fn example() -> hubwire::Result<()> {
//! let client = Client::builder().build()?;
//! let starred = client
//!     .request(
//!         "/user/starred/:owner/:repo",
//!         CallOptions::new()
//!             .var("owner", "rust-lang")
//!             .var("repo", "rust")
//!             .boolean(true),
//!     )
//!     .await?;
//! assert!(starred.as_flag().is_some());
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod client;
mod error;
mod options;
mod page;
mod resource;
pub mod telemetry;
mod template;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use options::{CacheChoice, CallOptions, DEFAULT_HOST, DEFAULT_PER_PAGE};
pub use page::Reply;
pub use resource::Resource;
pub use telemetry::{Telemetry, TelemetrySnapshot};
