//! Axum endpoint tests using the Router::oneshot pattern.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use backend::api;
use backend::store::SqliteStore;

async fn test_router() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create test database");
    let store = SqliteStore::new(pool);
    store.init_schema().await.expect("Failed to create schema");
    api::router(store)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_model_returns_created_row() {
    let app = test_router().await;

    let response = app
        .oneshot(post_json(
            "/api/models",
            json!({"name": "DeepSeek Chat", "provider_id": "deepseek/deepseek-chat"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "DeepSeek Chat");
    assert_eq!(body["provider_id"], "deepseek/deepseek-chat");
    assert_eq!(body["games_played"], 0);
    assert!(body["id"].as_i64().is_some());
}

#[tokio::test]
async fn create_model_rejects_blank_fields() {
    let app = test_router().await;

    let response = app
        .oneshot(post_json(
            "/api/models",
            json!({"name": "  ", "provider_id": "deepseek/deepseek-chat"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn duplicate_model_conflicts() {
    let app = test_router().await;

    let first = app
        .clone()
        .oneshot(post_json(
            "/api/models",
            json!({"name": "First", "provider_id": "x-ai/grok-4"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(post_json(
            "/api/models",
            json!({"name": "Second", "provider_id": "x-ai/grok-4"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_models_returns_all_rows() {
    let app = test_router().await;

    for (name, provider_id) in [("A", "a/one"), ("B", "b/two")] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/models",
                json!({"name": name, "provider_id": provider_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let models = body.as_array().unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0]["name"], "A");
}

#[tokio::test]
async fn unknown_match_is_not_found() {
    let app = test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/matches/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn starting_a_match_with_unknown_models_is_not_found() {
    let app = test_router().await;

    let response = app
        .oneshot(post_json(
            "/api/matches/start",
            json!({"white_model_id": 1, "black_model_id": 2}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
