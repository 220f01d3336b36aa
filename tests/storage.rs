//! Storage clients against a mock Redis, and fail-soft behaviour when the
//! backends are unreachable.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::{app_with_cache, get, offline_config, send, start_mock_redis, unreachable_redis_url};
use marketplace_web::config::{ObjectStoreConfig, RateLimitRule};
use marketplace_web::storage::{CacheSettings, CacheStore, ObjectStore};

fn settings(url: String) -> CacheSettings {
    CacheSettings {
        enabled: true,
        url,
        connect_timeout: Duration::from_millis(500),
        response_timeout: Duration::from_millis(500),
        default_ttl_secs: 300,
        session_ttl_secs: 600,
    }
}

#[tokio::test]
async fn cache_store_round_trip_uses_namespaces() {
    let redis = start_mock_redis().await;
    let store = CacheStore::initialize(settings(redis.url())).await;
    assert!(store.is_available());

    assert!(store.set("jobs:featured", &json!(["a", "b"]), None).await);
    let value: Option<serde_json::Value> = store.get("jobs:featured").await;
    assert_eq!(value, Some(json!(["a", "b"])));
    assert_eq!(redis.keys(), vec!["cache:jobs:featured".to_string()]);

    let ttl = redis.ttl("cache:jobs:featured").unwrap();
    assert!(ttl > Duration::from_secs(290) && ttl <= Duration::from_secs(300));

    assert!(store.delete("jobs:featured").await);
    assert!(!store.delete("jobs:featured").await);
    assert_eq!(store.get::<serde_json::Value>("jobs:featured").await, None);
}

#[tokio::test]
async fn sessions_expire_with_session_ttl() {
    let redis = start_mock_redis().await;
    let store = CacheStore::initialize(settings(redis.url())).await;

    assert!(store.set_session("abc", &json!({"user": 7})).await);
    assert_eq!(store.get_session("abc").await, Some(json!({"user": 7})));
    assert!(redis.ttl("session:abc").unwrap() > Duration::from_secs(590));

    assert!(store.touch_session("abc").await);
    assert!(!store.touch_session("missing").await);
    assert!(store.delete_session("abc").await);
    assert_eq!(store.get_session("abc").await, None);
}

#[tokio::test]
async fn rate_limit_counter_starts_window_on_first_hit() {
    let redis = start_mock_redis().await;
    let store = CacheStore::initialize(settings(redis.url())).await;

    let first = store.increment_rate_limit("api:10.0.0.1", 60).await.unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(first.resets_in_secs, 60);

    let second = store.increment_rate_limit("api:10.0.0.1", 60).await.unwrap();
    assert_eq!(second.count, 2);
    assert!(second.resets_in_secs <= 60);
    assert!(redis.ttl("rate_limit:api:10.0.0.1").unwrap() <= Duration::from_secs(60));
}

#[tokio::test]
async fn rate_limit_counter_without_expiry_is_repaired() {
    let redis = start_mock_redis().await;
    redis.seed("rate_limit:api:unknown", "1", None);
    let mut config = offline_config();
    config.rate_limit.api = RateLimitRule::new(2, 1);
    let app = app_with_cache(config, &redis.url()).await;

    assert_eq!(get(app.router(), "/api/v1/files").await.status, StatusCode::OK);
    assert!(redis.ttl("rate_limit:api:unknown").is_some());
    assert_eq!(
        get(app.router(), "/api/v1/files").await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(get(app.router(), "/api/v1/files").await.status, StatusCode::OK);
}

#[tokio::test]
async fn retry_after_reports_time_left_in_window() {
    let redis = start_mock_redis().await;
    redis.seed("rate_limit:api:unknown", "5", Some(Duration::from_secs(20)));
    let mut config = offline_config();
    config.rate_limit.api = RateLimitRule::new(5, 60);
    let app = app_with_cache(config, &redis.url()).await;

    let limited = get(app.router(), "/api/v1/files").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = limited.header("retry-after").unwrap().parse().unwrap();
    assert!((1..=20).contains(&retry_after), "retry-after {retry_after}");
}

#[tokio::test]
async fn unreachable_cache_returns_sentinels() {
    let store = CacheStore::initialize(settings(unreachable_redis_url())).await;
    assert!(store.is_enabled());
    assert!(!store.is_available());

    assert!(!store.set("k", &1, None).await);
    assert_eq!(store.get::<i32>("k").await, None);
    assert!(!store.delete("k").await);
    assert!(!store.set_session("s", &json!({})).await);
    assert_eq!(store.get_session("s").await, None);
    assert_eq!(store.increment_rate_limit("x", 60).await, None);
    assert!(store.ping().await.is_err());
    assert!(!store.health_check().await);
}

#[tokio::test]
async fn unconfigured_object_store_returns_sentinels() {
    let store = ObjectStore::initialize(ObjectStoreConfig::default()).await;
    assert!(!store.is_available());

    let upload = store
        .upload(bytes::Bytes::from_static(b"%PDF"), "cv.pdf", "resumes", None, None)
        .await;
    assert!(upload.is_none());
    assert!(store.download("resumes/cv.pdf").await.is_none());
    assert!(!store.delete("resumes/cv.pdf").await);
    assert!(store.list("resumes/", 10).await.is_empty());
    assert!(store.presign("resumes/cv.pdf", None).await.is_none());
    assert!(!store.health_check().await);
}

#[tokio::test]
async fn session_routes_with_live_cache() {
    let redis = start_mock_redis().await;
    let app = app_with_cache(offline_config(), &redis.url()).await;

    let create = Request::builder()
        .method("POST")
        .uri("/auth/session")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"user_id": 42}"#))
        .unwrap();
    let created = send(app.router(), create).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert!(created.header("set-cookie").unwrap().starts_with("session_id="));

    let id = created.json()["session_id"].as_str().unwrap().to_string();
    let fetched = get(app.router(), &format!("/auth/session/{id}")).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["data"]["user_id"], 42);

    let touch = Request::builder()
        .method("POST")
        .uri(format!("/auth/session/{id}/touch"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app.router(), touch).await.status, StatusCode::NO_CONTENT);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/auth/session/{id}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app.router(), delete).await.status, StatusCode::NO_CONTENT);

    let gone = get(app.router(), &format!("/auth/session/{id}")).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_returns_429_after_threshold() {
    let redis = start_mock_redis().await;
    let mut config = offline_config();
    config.rate_limit.api = RateLimitRule::new(2, 60);
    let app = app_with_cache(config, &redis.url()).await;

    assert_eq!(get(app.router(), "/api/v1/files").await.status, StatusCode::OK);
    assert_eq!(get(app.router(), "/api/v1/files").await.status, StatusCode::OK);

    let limited = get(app.router(), "/api/v1/files").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.header("retry-after"), Some("60"));
    assert_eq!(limited.json()["status"], 429);
    assert!(redis.keys().contains(&"rate_limit:api:unknown".to_string()));

    // Health probes are exempt.
    assert_eq!(get(app.router(), "/health").await.status, StatusCode::OK);
}

#[tokio::test]
async fn status_is_served_from_response_cache() {
    let redis = start_mock_redis().await;
    let app = app_with_cache(offline_config(), &redis.url()).await;

    let first = get(app.router(), "/api/v1/status").await;
    assert_eq!(first.header("x-cache"), Some("MISS"));
    assert!(redis.value("cache:view:/api/v1/status").is_some());

    let second = get(app.router(), "/api/v1/status").await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.header("x-cache"), Some("HIT"));
    assert_eq!(second.header("content-type"), Some("application/json"));
    assert_eq!(second.json(), first.json());
    assert_eq!(
        second.header("cache-control"),
        Some("no-cache, no-store, must-revalidate")
    );
}

#[tokio::test]
async fn health_reports_live_cache() {
    let redis = start_mock_redis().await;
    let app = app_with_cache(offline_config(), &redis.url()).await;
    let response = get(app.router(), "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "healthy");
}

#[tokio::test]
async fn oversized_responses_pass_through_uncached() {
    use std::sync::Arc;

    use axum::routing::get as get_route;
    use axum::Router;
    use marketplace_web::http::response_cache::{cache_response, ResponseCache};

    let redis = start_mock_redis().await;
    let store = Arc::new(CacheStore::initialize(settings(redis.url())).await);
    let big = "x".repeat(2 * 1024 * 1024);
    let served = big.clone();
    let router = Router::new()
        .route("/report", get_route(move || async move { served }))
        .layer(axum::middleware::from_fn_with_state(
            Arc::new(ResponseCache::new(store)),
            cache_response,
        ));

    let response = get(router, "/report").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-cache"), Some("MISS"));
    assert_eq!(response.body.len(), big.len());
    assert!(redis.value("cache:view:/report").is_none());
}
