// tests/proxy_tests.rs
// Dispatcher against a mockito upstream, through the real reqwest client.
use hyper::{Body, Request, Response, StatusCode};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use tmdb_proxy::config::UpstreamConfig;
use tmdb_proxy::proxy::{HttpUpstream, Proxy};

fn proxy_for(base_url: String) -> Proxy {
    let config = UpstreamConfig {
        base_url,
        api_secret: "KEY".to_string(),
    };
    Proxy::new(&config, Arc::new(HttpUpstream::new()))
}

async fn get(proxy: &Proxy, path: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response: Response<Body> = proxy.handle(req).await;
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn upstream() -> ServerGuard {
    Server::new_async().await
}

fn query(raw: &str) -> Matcher {
    Matcher::Exact(raw.to_string())
}

#[tokio::test]
async fn test_root_returns_popular_results() {
    let mut server = upstream().await;
    let mock = server
        .mock("GET", "/movie/popular")
        .match_query(query("api_key=KEY&language=fr&page=1"))
        .match_header("accept", "application/json")
        .with_header("content-type", "application/json")
        .with_body(r#"{"page":1,"results":[1,2,3]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[1,2,3]");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_page_param_passed_through() {
    let mut server = upstream().await;
    let mock = server
        .mock("GET", "/movie/popular")
        .match_query(query("api_key=KEY&language=fr&page=7"))
        .with_body(r#"{"results":[]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/7").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_listing_routes_default_to_page_one() {
    let mut server = upstream().await;
    let top_rated = server
        .mock("GET", "/movie/top_rated")
        .match_query(query("api_key=KEY&language=fr&page=1"))
        .with_body(r#"{"results":["t"]}"#)
        .create_async()
        .await;
    let upcoming = server
        .mock("GET", "/movie/upcoming")
        .match_query(query("api_key=KEY&language=fr&page=1"))
        .with_body(r#"{"results":["u"]}"#)
        .create_async()
        .await;
    let similar = server
        .mock("GET", "/movie/42/similar")
        .match_query(query("api_key=KEY&language=fr&page=1"))
        .with_body(r#"{"results":["s"]}"#)
        .create_async()
        .await;

    let proxy = proxy_for(server.url());
    assert_eq!(get(&proxy, "/toprated").await, (StatusCode::OK, r#"["t"]"#.to_string()));
    assert_eq!(get(&proxy, "/upcoming/").await, (StatusCode::OK, r#"["u"]"#.to_string()));
    assert_eq!(get(&proxy, "/similar/42").await, (StatusCode::OK, r#"["s"]"#.to_string()));

    top_rated.assert_async().await;
    upcoming.assert_async().await;
    similar.assert_async().await;
}

#[tokio::test]
async fn test_actors_returns_cast() {
    let mut server = upstream().await;
    let mock = server
        .mock("GET", "/movie/5/credits")
        .match_query(query("api_key=KEY&language=fr"))
        .with_body(r#"{"id":5,"cast":["A","B"],"crew":[]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/actors/5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"["A","B"]"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_actor_combines_three_calls_in_order() {
    let mut server = upstream().await;
    let person = server
        .mock("GET", "/person/123")
        .match_query(query("api_key=KEY&language=fr"))
        .with_body(r#"{"id":123,"name":"Jane"}"#)
        .create_async()
        .await;
    let external_ids = server
        .mock("GET", "/person/123/external_ids")
        .match_query(query("api_key=KEY&language=fr"))
        .with_body(r#"{"imdb_id":"nm0000123"}"#)
        .create_async()
        .await;
    let credits = server
        .mock("GET", "/person/123/movie_credits")
        .match_query(query("api_key=KEY&language=fr"))
        .with_body(r#"{"cast":[{"id":1}]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/actor/123").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body,
        json!([
            {"id": 123, "name": "Jane"},
            {"imdb_id": "nm0000123"},
            {"cast": [{"id": 1}]}
        ])
    );
    person.assert_async().await;
    external_ids.assert_async().await;
    credits.assert_async().await;
}

#[tokio::test]
async fn test_actor_single_failure_fails_route() {
    let mut server = upstream().await;
    let _person = server
        .mock("GET", "/person/9")
        .match_query(Matcher::Any)
        .with_body(r#"{"id":9}"#)
        .create_async()
        .await;
    let _external_ids = server
        .mock("GET", "/person/9/external_ids")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    let _credits = server
        .mock("GET", "/person/9/movie_credits")
        .match_query(Matcher::Any)
        .with_body(r#"{"cast":[]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/actor/9").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "upstream responded with status 503 Service Unavailable");
}

#[tokio::test]
async fn test_movie_returns_whole_object() {
    let mut server = upstream().await;
    let mock = server
        .mock("GET", "/movie/550")
        .match_query(query("api_key=KEY&language=fr"))
        .with_body(r#"{"id":550,"title":"Fight Club"}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/movie/550").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"id": 550, "title": "Fight Club"}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_search_defaults_to_empty_query() {
    let mut server = upstream().await;
    let mock = server
        .mock("GET", "/search/movie")
        .match_query(query("api_key=KEY&language=fr&query=&page=1"))
        .with_body(r#"{"results":[]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/movie/search").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_search_query_is_interpolated_raw() {
    let mut server = upstream().await;
    // `&` in the query splits the upstream parameter in two.
    let mock = server
        .mock("GET", "/search/movie")
        .match_query(query("api_key=KEY&language=fr&query=tom&jerry&page=2"))
        .with_body(r#"{"results":[{"title":"Tom"}]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/movie/search/tom&jerry/2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"[{"title":"Tom"}]"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_encoded_search_query_is_decoded_before_interpolation() {
    let mut server = upstream().await;
    let mock = server
        .mock("GET", "/search/movie")
        .match_query(query("api_key=KEY&language=fr&query=tom&jerry&page=2"))
        .with_body(r#"{"results":[]}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/movie/search/tom%26jerry/2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invalid_utf8_param_is_404() {
    let (status, _) = get(&proxy_for("http://127.0.0.1:1/".to_string()), "/movie/%FF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_network_failure_is_500_with_message() {
    // Nothing listens on port 1.
    let proxy = proxy_for("http://127.0.0.1:1/".to_string());

    let (status, body) = get(&proxy, "/similar/5/1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("error sending request"), "body was {:?}", body);
    assert!(!body.contains("KEY"));
}

#[tokio::test]
async fn test_non_json_body_is_500() {
    let mut server = upstream().await;
    let _movie = server
        .mock("GET", "/movie/1")
        .match_query(Matcher::Any)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/movie/1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("invalid JSON from upstream"), "body was {:?}", body);
}

#[tokio::test]
async fn test_upstream_error_status_is_500() {
    let mut server = upstream().await;
    let _popular = server
        .mock("GET", "/movie/popular")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"status_code":7,"status_message":"Invalid API key"}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/2").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "upstream responded with status 401 Unauthorized");
}

#[tokio::test]
async fn test_missing_field_is_empty_200() {
    let mut server = upstream().await;
    let _upcoming = server
        .mock("GET", "/movie/upcoming")
        .match_query(Matcher::Any)
        .with_body(r#"{"page":1}"#)
        .create_async()
        .await;

    let (status, body) = get(&proxy_for(server.url()), "/upcoming/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}
