//! Basic example demonstrating templated GET and POST requests.
//!
//! This example shows how to:
//! - Create a client with instance defaults
//! - Resolve path templates from call variables
//! - Inspect the classified resource and telemetry
//!
//! Run with: `cargo run --example basic_request`

use hubwire::{CallOptions, Client, Error, Resource};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("hubwire=debug,basic_request=info")
        .init();

    let client = Client::builder().user_agent("hubwire-demo/0.1").build()?;

    println!("=== Templated GET ===");
    let repo = client
        .request(
            "/repos/:owner/:repo",
            CallOptions::new().var("owner", "rust-lang").var("repo", "rust"),
        )
        .await?;

    match repo.resource() {
        Resource::Object(map) => {
            println!("Full name: {}", map["full_name"]);
            println!("Stars: {}", map["stargazers_count"]);
        }
        other => println!("Unexpected shape: {other:?}"),
    }

    println!();
    println!("=== Telemetry ===");
    let snapshot = client.telemetry().snapshot();
    println!("Rate limit: {:?}", snapshot.rate_limit);
    println!("Remaining: {:?}", snapshot.rate_limit_remaining);

    println!();
    println!("=== Interpolation without a request ===");
    let path = client.interpolate(
        "/repos/:owner/:repo/issues/{issue.number}",
        &CallOptions::new()
            .var("owner", "rust-lang")
            .var("repo", "rust")
            .var("issue", serde_json::json!({"number": 1})),
    )?;
    println!("Resolved path: {path}");

    Ok(())
}
