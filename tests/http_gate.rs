//! Routing-layer behaviour that never reaches the database: module gating,
//! index redirects, representation rejection. The pool is lazy, so no
//! PostgreSQL instance is needed.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use relief_rest::{
    common_routes_with_ready, deploy, rest_routes, AppState, BasicRenderer, MessageCatalog,
    PermitAll, ResourceRegistry, SettingsRegistry,
};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let mut settings = SettingsRegistry::new();
    deploy::register_templates(&mut settings);
    settings.append_template("Skeleton").unwrap();
    settings.freeze();

    let mut registry = ResourceRegistry::new();
    deploy::register_resources(&mut registry).unwrap();
    registry.freeze();

    let pool = sqlx::PgPool::connect_lazy("postgres://localhost/relief_test")
        .expect("lazy pool");
    let state = AppState {
        pool,
        settings: Arc::new(settings),
        registry: Arc::new(registry),
        policy: Arc::new(PermitAll),
        renderer: Arc::new(BasicRenderer),
        catalog: Arc::new(MessageCatalog::new(vec!["en".into()])),
    };
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(rest_routes(state))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn disabled_module_is_not_found() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/bug/report.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Module disabled: bug");
}

#[tokio::test]
async fn module_index_redirects_to_default_function() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/uav").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/uav/dataset"
    );
}

#[tokio::test]
async fn unknown_function_in_enabled_module_is_not_found() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/hrm/nonsense")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unknown_resource");
}

#[tokio::test]
async fn unrecognised_representation_is_not_acceptable() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/hrm/course.docx")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn health_needs_no_database() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/hrm/course/create.json")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
