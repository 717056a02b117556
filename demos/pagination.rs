//! Example demonstrating eager and lazy pagination.
//!
//! This example shows how to:
//! - Merge every page of an array response into one sequence
//! - Walk pages on demand with a continuation
//! - Adapt the walk into a lazy stream
//!
//! Run with: `cargo run --example pagination`

use futures::{StreamExt, TryStreamExt};
use hubwire::{CallOptions, Client, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("hubwire=debug,pagination=info")
        .init();

    let client = Client::builder().user_agent("hubwire-demo/0.1").build()?;
    let vars = CallOptions::new().var("owner", "rust-lang").var("repo", "rust");

    println!("=== Eager: merge all pages ===");
    let all = client
        .request("/repos/:owner/:repo/contributors", vars.clone().per_page(30))
        .await?;
    println!(
        "{} contributors across all pages",
        all.as_items().map_or(0, |items| items.len())
    );

    println!();
    println!("=== Lazy: one page at a time ===");
    let mut reply = client
        .request(
            "/repos/:owner/:repo/contributors",
            vars.clone().per_page(10).all_pages(false),
        )
        .await?;
    let mut page_number = 1;
    while page_number <= 3 {
        println!(
            "page {page_number}: {} contributors",
            reply.as_items().map_or(0, |items| items.len())
        );
        match reply.next().await? {
            Some(following) => reply = following,
            None => break,
        }
        page_number += 1;
    }

    println!();
    println!("=== Lazy: as a stream ===");
    let reply = client
        .request(
            "/repos/:owner/:repo/contributors",
            vars.per_page(10).all_pages(false),
        )
        .await?;
    let pages: Vec<_> = reply.into_pages().take(2).try_collect().await?;
    println!("streamed {} pages", pages.len());

    Ok(())
}
