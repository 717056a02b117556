//! Example demonstrating conditional caching and immutable GETs.
//!
//! This example shows how to:
//! - Revalidate cached responses with `If-None-Match`
//! - Serve immutable resources from cache without revalidation
//! - Supply a custom cache store
//!
//! Run with: `cargo run --example caching`

use hubwire::cache::MemoryCache;
use hubwire::{CallOptions, Client, Error};
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("hubwire=debug,caching=info")
        .init();

    let client = Client::builder().user_agent("hubwire-demo/0.1").build()?;
    let options = CallOptions::new().var("owner", "rust-lang").var("repo", "rust");

    println!("=== Conditional caching ===");
    // First fetch populates the default cache with the response and its ETag.
    let start = Instant::now();
    client.request("/repos/:owner/:repo", options.clone()).await?;
    println!("cold fetch: {:?}", start.elapsed());

    // The second fetch revalidates; a 304 serves the cached value and does
    // not count against the rate limit.
    let start = Instant::now();
    client.request("/repos/:owner/:repo", options.clone()).await?;
    println!("revalidated fetch: {:?}", start.elapsed());
    println!(
        "remaining after revalidation: {:?}",
        client.telemetry().rate_limit_remaining()
    );

    println!();
    println!("=== Immutable GETs with a custom store ===");
    let store = Arc::new(MemoryCache::new(1_000_000));
    let immutable = options.cache_store(store).immutable(true);

    let start = Instant::now();
    client.request("/repos/:owner/:repo", immutable.clone()).await?;
    println!("cold fetch: {:?}", start.elapsed());

    // No network call at all this time.
    let start = Instant::now();
    client.request("/repos/:owner/:repo", immutable).await?;
    println!("cache-served fetch: {:?}", start.elapsed());

    Ok(())
}
