//! End-to-end HTTP tests for the search gateway.
//!
//! Each test starts mock Meilisearch and backend servers plus the gateway on
//! random ports and drives `POST /api/search` through reqwest, covering the
//! primary hit path, every fallback trigger and the wire formats sent
//! upstream.

use anify::api::ApiServer;
use anify::config::Config;
use anify::search::SearchPipeline;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One request seen by a mock upstream
#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    query: HashMap<String, String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    response: Value,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn meili_search(
    State(state): State<MockState>,
    Path(index): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.lock().unwrap().push(Recorded {
        path: format!("/indexes/{}/search", index),
        query: HashMap::new(),
        authorization: authorization(&headers),
        body,
    });
    (state.status, Json(state.response.clone()))
}

async fn backend_search(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.lock().unwrap().push(Recorded {
        path: "/search-advanced".to_string(),
        query,
        authorization: authorization(&headers),
        body,
    });
    (state.status, Json(state.response.clone()))
}

/// Serve `router` on a random port and return its base URL
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn mock_meilisearch(
    status: StatusCode,
    response: Value,
) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        response,
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/indexes/:index/search", post(meili_search))
        .with_state(state);
    (spawn(router).await, seen)
}

async fn mock_backend(status: StatusCode, response: Value) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        response,
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/search-advanced", post(backend_search))
        .with_state(state);
    (spawn(router).await, seen)
}

/// Start the gateway against the given upstreams
async fn start_gateway(meili_url: Option<&str>, backend_url: &str) -> String {
    let mut config = Config::default();
    config.backend.url = backend_url.to_string();
    config.backend.api_key = Some("backend-key".to_string());
    config.meilisearch.key = Some("meili-key".to_string());
    config.meilisearch.timeout_ms = 2000;
    config.backend.timeout_ms = 2000;
    if let Some(url) = meili_url {
        config.meilisearch.enabled = true;
        config.meilisearch.url = url.to_string();
    }

    let pipeline = Arc::new(SearchPipeline::from_config(&config).unwrap());
    let router = ApiServer::with_config(pipeline, &config.server).router();
    spawn(router).await
}

async fn search(base_url: &str, body: Value) -> (u16, Value) {
    let resp = Client::new()
        .post(format!("{}/api/search", base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

fn meili_page(hits: Value) -> Value {
    let total = hits.as_array().map(|h| h.len()).unwrap_or(0);
    json!({
        "hits": hits,
        "query": "one piece",
        "processingTimeMs": 3,
        "limit": 10,
        "offset": 0,
        "estimatedTotalHits": total,
        "facetStats": {}
    })
}

fn backend_items() -> Value {
    json!([
        {"id": "21", "title": {"romaji": "One Piece"}},
        {"id": "30013", "title": {"romaji": "One Piece Film"}}
    ])
}

#[tokio::test]
async fn test_missing_query_returns_400() {
    let (backend_url, seen) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(None, &backend_url).await;

    let (status, body) = search(&gateway, json!({"type": "anime"})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"message": "Missing query."}));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_type_returns_400() {
    let (backend_url, _seen) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(None, &backend_url).await;

    let (status, body) = search(&gateway, json!({"query": "one piece"})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"message": "Missing type (anime/manga)."}));
}

#[tokio::test]
async fn test_primary_hit_passes_through() {
    let page = meili_page(json!([{"id": "21"}]));
    let (meili_url, meili_seen) = mock_meilisearch(StatusCode::OK, page.clone()).await;
    let (backend_url, backend_seen) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(Some(&meili_url), &backend_url).await;

    let (status, body) = search(
        &gateway,
        json!({
            "query": "one piece",
            "type": "anime",
            "page": 2,
            "perPage": 20,
            "formats": ["TV", "OVA"],
            "genres": ["Action"]
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, page);
    assert!(backend_seen.lock().unwrap().is_empty());

    let seen = meili_seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/indexes/anime/search");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer meili-key"));
    assert_eq!(
        seen[0].body,
        json!({
            "q": "one piece",
            "limit": 20,
            "offset": 40,
            "filter": "(format = TV OR format = OVA) AND (genres = Action)"
        })
    );
}

#[tokio::test]
async fn test_empty_primary_falls_back_to_backend() {
    let (meili_url, _) = mock_meilisearch(StatusCode::OK, meili_page(json!([]))).await;
    let (backend_url, backend_seen) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(Some(&meili_url), &backend_url).await;

    let (status, body) = search(
        &gateway,
        json!({"query": "one piece", "type": "anime", "page": 1, "perPage": 10}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "hits": backend_items(),
            "query": "one piece",
            "processingTimeMs": 0,
            "limit": 10,
            "offset": 10,
            "estimatedTotalHits": 2
        })
    );
    assert_eq!(backend_seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_primary_error_falls_back_to_backend() {
    let (meili_url, meili_seen) = mock_meilisearch(
        StatusCode::BAD_REQUEST,
        json!({"message": "Invalid filter", "code": "invalid_search_filter"}),
    )
    .await;
    let (backend_url, backend_seen) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(Some(&meili_url), &backend_url).await;

    let (status, body) = search(
        &gateway,
        json!({"query": "one piece", "type": "anime", "genresExcluded": ["Horror"]}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["hits"], backend_items());
    assert_eq!(body["estimatedTotalHits"], 2);

    let meili = meili_seen.lock().unwrap();
    assert_eq!(meili[0].body["filter"], " AND NOT (genres = Horror)");
    assert_eq!(backend_seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_primary_falls_back_to_backend() {
    // Bind then drop a listener to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (backend_url, _) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(Some(&dead_url), &backend_url).await;

    let (status, body) = search(&gateway, json!({"query": "one piece", "type": "anime"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["hits"], backend_items());
}

#[tokio::test]
async fn test_disabled_primary_sends_advanced_search() {
    let (backend_url, backend_seen) = mock_backend(StatusCode::OK, json!([])).await;
    let gateway = start_gateway(None, &backend_url).await;

    let (status, body) = search(
        &gateway,
        json!({
            "query": "mushoku tensei",
            "type": "manga",
            "formats": ["NOVEL"],
            "tags": ["Isekai"],
            "tagsExcluded": ["Gore"]
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["hits"], json!([]));
    assert_eq!(body["estimatedTotalHits"], 0);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["offset"], 0);

    let seen = backend_seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].query.get("apikey").map(String::as_str), Some("backend-key"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer meili-key"));
    assert_eq!(
        seen[0].body,
        json!({
            "type": "novel",
            "query": "mushoku tensei",
            "format": ["NOVEL"],
            "page": 0,
            "perPage": 10,
            "genres": [],
            "genresExcluded": [],
            "tags": ["Isekai"],
            "tagsExcluded": ["Gore"],
            "year": 0
        })
    );
}

#[tokio::test]
async fn test_backend_type_mapping() {
    let (backend_url, backend_seen) = mock_backend(StatusCode::OK, json!([])).await;
    let gateway = start_gateway(None, &backend_url).await;

    search(&gateway, json!({"query": "berserk", "type": "manga", "formats": ["MANGA"]})).await;
    search(&gateway, json!({"query": "berserk", "type": "anime", "formats": ["NOVEL"]})).await;

    let seen = backend_seen.lock().unwrap();
    assert_eq!(seen[0].body["type"], "manga");
    assert_eq!(seen[1].body["type"], "anime");
}

#[tokio::test]
async fn test_primary_page_without_query_passes_through() {
    let page = json!({
        "hits": [{"id": "1"}],
        "processingTimeMs": 1,
        "limit": 10,
        "offset": 0,
        "estimatedTotalHits": 1
    });
    let (meili_url, _) = mock_meilisearch(StatusCode::OK, page.clone()).await;
    let (backend_url, backend_seen) = mock_backend(StatusCode::OK, backend_items()).await;
    let gateway = start_gateway(Some(&meili_url), &backend_url).await;

    let (status, body) = search(&gateway, json!({"query": "one piece", "type": "anime"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, page);
    assert!(backend_seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_failure_returns_502() {
    let (backend_url, _) =
        mock_backend(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "down"})).await;
    let gateway = start_gateway(None, &backend_url).await;

    let (status, body) = search(&gateway, json!({"query": "one piece", "type": "anime"})).await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({"message": "Search backend unavailable."}));
}

#[tokio::test]
async fn test_unreachable_backend_does_not_expose_api_key() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let gateway = start_gateway(None, &dead_url).await;

    let (status, body) = search(&gateway, json!({"query": "one piece", "type": "anime"})).await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({"message": "Search backend unavailable."}));
    assert!(!body.to_string().contains("backend-key"));
}
