//! Integration tests using wiremock to simulate the API.

use async_trait::async_trait;
use futures::TryStreamExt;
use hubwire::cache::{CacheEntry, CacheStore, MemoryCache};
use hubwire::{CallOptions, Client, Error, Resource};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A cache store that counts writes, for asserting what gets (re)stored.
struct CountingStore {
    inner: MemoryCache,
    sets: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryCache::new(100_000),
            sets: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, entry).await;
    }

    async fn remove(&self, key: &str) {
        self.inner.remove(key).await;
    }
}

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .host(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_get_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/rust-lang/rust"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "full_name": "rust-lang/rust"})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client
        .request(
            "/repos/:owner/:repo",
            CallOptions::new().var("owner", "rust-lang").var("repo", "rust"),
        )
        .await
        .unwrap();

    let object = reply.as_object().expect("object resource");
    assert_eq!(object["full_name"], json!("rust-lang/rust"));
}

#[tokio::test]
async fn test_missing_template_variable_fails_before_network() {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server);

    let result = client
        .request("/repos/:owner/:repo", CallOptions::new().var("owner", "a"))
        .await;

    match result {
        Err(Error::Template { variable, template }) => {
            assert_eq!(variable, "repo");
            assert_eq!(template, "/repos/:owner/:repo");
        }
        other => panic!("expected template error, got {other:?}"),
    }
    // Nothing reached the server.
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_method_shorthand_routes_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/a/b/issues"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"number": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client
        .request(
            "POST /repos/:owner/:repo/issues",
            CallOptions::new().var("owner", "a").var("repo", "b"),
        )
        .await
        .unwrap();

    assert_eq!(reply.as_object().unwrap()["number"], json!(1));
}

#[tokio::test]
async fn test_interpolate_entry_point() {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server);

    let path = client
        .interpolate(
            "/repos/:owner/:repo",
            &CallOptions::new().var("owner", "a").var("repo", "b"),
        )
        .unwrap();
    assert_eq!(path, "/repos/a/b");
}

#[tokio::test]
async fn test_etag_revalidation_serves_cached_value() {
    let mock_server = MockServer::start().await;

    // A revalidation presenting the stored ETag gets a bodyless 304.
    Mock::given(method("GET"))
        .and(path("/cached"))
        .and(header("if-none-match", "\"abc\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 7, "name": "cached"}))
                .insert_header("etag", "\"abc\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(CountingStore::new());
    let client = client_for(&mock_server);
    let options = CallOptions::new().cache_store(store.clone());

    let first = client.request("/cached", options.clone()).await.unwrap();
    assert_eq!(store.sets.load(Ordering::SeqCst), 1);

    let second = client.request("/cached", options).await.unwrap();
    assert_eq!(second.resource(), first.resource());
    // The 304 served the cached value without a new cache write.
    assert_eq!(store.sets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_immutable_get_served_from_cache_without_revalidation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gists/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "1"}))
                .insert_header("etag", "\"g1\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store: Arc<MemoryCache> = Arc::new(MemoryCache::new(100_000));
    let client = client_for(&mock_server);
    let options = CallOptions::new().cache_store(store).immutable(true);

    let first = client.request("/gists/1", options.clone()).await.unwrap();
    // Served locally: the transport is not consulted again.
    let second = client.request("/gists/1", options).await.unwrap();
    assert_eq!(second.resource(), first.resource());
}

#[tokio::test]
async fn test_immutable_get_single_flight() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gists/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store: Arc<MemoryCache> = Arc::new(MemoryCache::new(100_000));
    let client = client_for(&mock_server);
    let options = CallOptions::new().cache_store(store).immutable(true);

    let first = tokio::spawn({
        let client = client.clone();
        let options = options.clone();
        async move { client.request("/gists/2", options).await }
    });
    // Give the first call time to pin its in-flight entry.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = client.request("/gists/2", options).await.unwrap();

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.resource(), second.resource());
}

#[tokio::test]
async fn test_eager_pagination_merges_pages_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([3, 4])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([1, 2]))
                .insert_header(
                    "link",
                    format!("<{}/items?page=2>; rel=\"next\"", mock_server.uri()).as_str(),
                ),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client.request("/items", CallOptions::new()).await.unwrap();

    assert_eq!(
        reply.as_items().unwrap(),
        &[json!(1), json!(2), json!(3), json!(4)]
    );
}

#[tokio::test]
async fn test_lazy_pagination_continuation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([3, 4])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([1, 2]))
                .insert_header(
                    "link",
                    format!("<{}/items?page=2>; rel=\"next\"", mock_server.uri()).as_str(),
                ),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let first = client
        .request("/items", CallOptions::new().all_pages(false))
        .await
        .unwrap();

    assert_eq!(first.as_items().unwrap(), &[json!(1), json!(2)]);
    assert!(first.has_next());

    let second = first.next().await.unwrap().expect("second page");
    assert_eq!(second.as_items().unwrap(), &[json!(3), json!(4)]);
    assert!(!second.has_next());
    assert!(second.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_lazy_pagination_as_stream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([3])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([1, 2]))
                .insert_header(
                    "link",
                    format!("<{}/items?page=2>; rel=\"next\"", mock_server.uri()).as_str(),
                ),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client
        .request("/items", CallOptions::new().all_pages(false))
        .await
        .unwrap();

    let pages: Vec<Resource> = reply.into_pages().try_collect().await.unwrap();
    assert_eq!(
        pages,
        vec![
            Resource::Items(vec![json!(1), json!(2)]),
            Resource::Items(vec![json!(3)]),
        ]
    );
}

#[tokio::test]
async fn test_not_found_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let with_fallback = client
        .request(
            "/missing",
            CallOptions::new().if_not_found(&json!([])).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(with_fallback.resource(), &Resource::Items(vec![]));

    let without_fallback = client.request("/missing", CallOptions::new()).await;
    match without_fallback {
        Err(error @ Error::Api { .. }) => {
            assert!(error.to_string().contains("404"), "got: {error}");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_boolean_no_content_resolves_true() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/starred/a/b"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client
        .request(
            "/user/starred/:owner/:repo",
            CallOptions::new()
                .var("owner", "a")
                .var("repo", "b")
                .boolean(true),
        )
        .await
        .unwrap();

    assert_eq!(reply.as_flag(), Some(true));
}

#[tokio::test]
async fn test_boolean_not_found_resolves_false() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/starred/a/b"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client
        .request(
            "/user/starred/:owner/:repo",
            CallOptions::new()
                .var("owner", "a")
                .var("repo", "b")
                .boolean(true),
        )
        .await
        .unwrap();

    assert_eq!(reply.as_flag(), Some(false));
}

#[tokio::test]
async fn test_api_error_aggregates_nested_messages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/a/b/issues"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation Failed",
            "errors": [
                {"message": "title is missing"},
                {"resource": "Issue", "message": "body is too long"},
            ],
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .request(
            "POST /repos/:owner/:repo/issues",
            CallOptions::new().var("owner", "a").var("repo", "b"),
        )
        .await;

    let error = result.unwrap_err();
    let rendered = error.to_string();
    assert!(rendered.contains("422"), "got: {rendered}");
    assert!(rendered.contains("Validation Failed"), "got: {rendered}");
    assert!(
        rendered.contains("(title is missing, body is too long)"),
        "got: {rendered}"
    );
}

#[tokio::test]
async fn test_telemetry_tracks_rate_limit_and_retains_scopes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .insert_header("x-ratelimit-limit", "60")
                .insert_header("x-ratelimit-remaining", "42")
                .insert_header("x-oauth-scopes", "repo, gist"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .insert_header("x-ratelimit-limit", "60")
                .insert_header("x-ratelimit-remaining", "41"),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    client.request("/first", CallOptions::new()).await.unwrap();
    let snapshot = client.telemetry().snapshot();
    assert_eq!(snapshot.rate_limit, Some(60));
    assert_eq!(snapshot.rate_limit_remaining, Some(42));
    assert_eq!(snapshot.oauth_scopes, vec!["repo", "gist"]);

    client.request("/second", CallOptions::new()).await.unwrap();
    let snapshot = client.telemetry().snapshot();
    assert_eq!(snapshot.rate_limit_remaining, Some(41));
    // The second response omitted the scopes header: last known set retained.
    assert_eq!(snapshot.oauth_scopes, vec!["repo", "gist"]);
}

#[tokio::test]
async fn test_per_page_sent_as_query_parameter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.request("/items", CallOptions::new()).await.unwrap();
}

#[tokio::test]
async fn test_cacheless_requests_defeat_transport_caching() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fresh"))
        .and(header("if-modified-since", "Sat, 1 Jan 2000 00:00:00 GMT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client
        .request("/fresh", CallOptions::new().no_cache())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_token_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "token sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octo"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .host(mock_server.uri())
        .unwrap()
        .token("sekrit")
        .build()
        .unwrap();
    client.request("/user", CallOptions::new()).await.unwrap();
}

#[tokio::test]
async fn test_basic_auth_when_no_token() {
    let mock_server = MockServer::start().await;

    // "user:pass" in base64.
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "user"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .host(mock_server.uri())
        .unwrap()
        .username("user")
        .password("pass")
        .build()
        .unwrap();
    client.request("/user", CallOptions::new()).await.unwrap();
}

#[tokio::test]
async fn test_body_sent_as_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/a/b/issues"))
        .and(body_json(json!({"title": "An issue"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"number": 5})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client
        .request(
            "POST /repos/:owner/:repo/issues",
            CallOptions::new()
                .var("owner", "a")
                .var("repo", "b")
                .body(&json!({"title": "An issue"}))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(reply.as_object().unwrap()["number"], json!(5));
}

#[tokio::test]
async fn test_plain_text_response_classified_as_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/readme"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# hello"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client.request("/readme", CallOptions::new()).await.unwrap();
    assert_eq!(reply.as_text(), Some("# hello"));
}

#[tokio::test]
async fn test_media_marker_parses_text_as_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"id\": 9}")
                .insert_header("x-github-media-type", "github.v3; format=json"),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let reply = client.request("/raw", CallOptions::new()).await.unwrap();
    assert_eq!(reply.as_object().unwrap()["id"], json!(9));
}

#[tokio::test]
async fn test_pagination_failure_rejects_whole_operation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([1, 2]))
                .insert_header(
                    "link",
                    format!("<{}/items?page=2>; rel=\"next\"", mock_server.uri()).as_str(),
                ),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.request("/items", CallOptions::new()).await;

    // Page 1's items are discarded: the operation fails as a whole.
    let error = result.unwrap_err();
    assert!(error.to_string().contains("500"), "got: {error}");
}
