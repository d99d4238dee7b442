//! Drives a real axum router through the capture middleware.

use axum::{
    body::Body,
    extract::{Path as UrlPath, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use querylog_config::Config;
use querylog_core::{read_entries, scope, AppRootResolver, Binding, Identity, QueryExecuted, QueryLog};
use querylog_web::with_query_log;
use serde_json::json;
use std::path::{Path, PathBuf};
use tower::ServiceExt;

fn query_log(storage_root: &Path) -> QueryLog {
    let config = Config {
        enabled: true,
        storage_root: storage_root.to_path_buf(),
        ..Config::default()
    };
    // events built in this file carry this file's location
    let app_root = Path::new(file!()).parent().unwrap();
    QueryLog::with_resolver(&config, AppRootResolver::new(app_root))
}

async fn show_user(UrlPath(id): UrlPath<i64>) -> String {
    scope::report(&QueryExecuted::new(
        "select * from users where id = ?",
        vec![Binding::from(id)],
        1.5,
        "sqlite",
    ));
    format!("user {id}")
}

async fn failing() -> StatusCode {
    scope::report(&QueryExecuted::new("delete from carts", vec![], 0.5, "sqlite"));
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn static_page() -> &'static str {
    "no queries here"
}

async fn authenticate(mut req: Request, next: Next) -> Response {
    req.extensions_mut()
        .insert(Identity::new(7, Some("ada@example.com".to_string())));
    next.run(req).await
}

fn app(log: QueryLog) -> Router {
    let routes = Router::new()
        .route("/users/{id}", get(show_user))
        .route("/fail", get(failing))
        .route("/static", get(static_page));
    with_query_log(routes, Some(log)).layer(middleware::from_fn(authenticate))
}

async fn authenticate_in_scope(req: Request, next: Next) -> Response {
    scope::identify(Identity::new(11, Some("grace@example.com".to_string())));
    next.run(req).await
}

async fn tag_response_identity(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.extensions_mut().insert(Identity::new(12, None));
    response
}

fn get_request(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header("host", "example.test")
        .header("user-agent", "integration-test")
        .body(Body::empty())
        .unwrap()
}

fn todays_log(log: &QueryLog) -> PathBuf {
    log.paths().for_date(Utc::now().date_naive())
}

#[tokio::test]
async fn test_request_queries_are_flushed_with_meta() {
    let dir = tempfile::tempdir().unwrap();
    let log = query_log(dir.path());

    let response = app(log.clone()).oneshot(get_request("/users/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = read_entries(&todays_log(&log)).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry["total_query_count"], 1);
    assert_eq!(entry["queries"][0]["final_query"], "select * from users where id = 42");
    assert_eq!(entry["meta"]["url"], "http://example.test/users/42");
    assert_eq!(entry["meta"]["method"], "GET");
    assert_eq!(entry["meta"]["user_agent"], "integration-test");
    assert_eq!(
        entry["meta"]["authenticated_user"],
        json!({"id": 7, "email": "ada@example.com"})
    );
}

#[tokio::test]
async fn test_identity_from_route_layer_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = query_log(dir.path());
    let routes = Router::new()
        .route("/users/{id}", get(show_user))
        .route_layer(middleware::from_fn(authenticate_in_scope));

    let response = with_query_log(routes, Some(log.clone()))
        .oneshot(get_request("/users/3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = read_entries(&todays_log(&log)).unwrap();
    assert_eq!(
        entries[0]["meta"]["authenticated_user"],
        json!({"id": 11, "email": "grace@example.com"})
    );
}

#[tokio::test]
async fn test_identity_from_response_extensions_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = query_log(dir.path());
    let routes = Router::new()
        .route("/users/{id}", get(show_user))
        .route_layer(middleware::from_fn(tag_response_identity));

    with_query_log(routes, Some(log.clone()))
        .oneshot(get_request("/users/4"))
        .await
        .unwrap();

    let entries = read_entries(&todays_log(&log)).unwrap();
    assert_eq!(entries[0]["meta"]["authenticated_user"], json!({"id": 12, "email": null}));
}

#[tokio::test]
async fn test_each_request_is_its_own_batch() {
    let dir = tempfile::tempdir().unwrap();
    let log = query_log(dir.path());

    for id in [1, 2, 3] {
        let uri = format!("/users/{id}");
        app(log.clone()).oneshot(get_request(&uri)).await.unwrap();
    }

    let entries = read_entries(&todays_log(&log)).unwrap();
    assert_eq!(entries.len(), 3);
    for (entry, id) in entries.iter().zip([1, 2, 3]) {
        assert_eq!(entry["total_query_count"], 1);
        assert_eq!(entry["queries"][0]["sl"], 1);
        assert_eq!(entry["queries"][0]["bindings"], json!([id]));
    }
}

#[tokio::test]
async fn test_request_without_queries_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log = query_log(dir.path());

    let response = app(log.clone()).oneshot(get_request("/static")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!todays_log(&log).exists());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_error_responses_are_still_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = query_log(dir.path());

    let response = app(log.clone()).oneshot(get_request("/fail")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_entries(&todays_log(&log)).unwrap().len(), 1);
}

#[tokio::test]
async fn test_write_failure_does_not_break_the_response() {
    let dir = tempfile::tempdir().unwrap();
    // storage root is a regular file, so the log directory cannot be created
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();
    let log = query_log(&blocker);

    let response = app(log).oneshot(get_request("/users/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_disabled_log_leaves_router_untouched() {
    let routes = Router::new().route("/users/{id}", get(show_user));
    let response = with_query_log(routes, None)
        .oneshot(get_request("/users/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
