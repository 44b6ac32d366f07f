// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health, liveness and cross-origin tests

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use detect_node::api::HealthResponse;
use tower::util::ServiceExt;

use crate::common::{failed_app, json_body, stub_app, ALLOWED_ORIGIN};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_root_liveness() {
    let (app, _, _) = stub_app(Vec::new());
    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"message": "Object detection API is running!"})
    );
}

#[tokio::test]
async fn test_health_with_loaded_model() {
    let (app, _, _) = stub_app(Vec::new());
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.model.loaded);
    assert_eq!(health.model.classes, 3);
    assert!(health.model.error.is_none());
    assert_eq!(health.build["name"], "detect-node");
    assert_eq!(health.build["version"], health.version);
}

#[tokio::test]
async fn test_health_with_failed_model() {
    let (app, _) = failed_app();
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.model.loaded);
    assert_eq!(health.model.path.as_deref(), Some("./models/best.onnx"));
    assert!(health.model.error.unwrap().contains("not found"));
}

#[tokio::test]
async fn test_preflight_from_allowed_origin() {
    let (app, _, _) = stub_app(Vec::new());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/detect/")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-custom")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "POST"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "content-type,x-custom"
    );
}

#[tokio::test]
async fn test_simple_request_from_allowed_origin() {
    let (app, _, _) = stub_app(Vec::new());

    let mut request = get("/");
    request
        .headers_mut()
        .insert(header::ORIGIN, ALLOWED_ORIGIN.parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        ALLOWED_ORIGIN
    );
}

#[tokio::test]
async fn test_disallowed_origin_gets_no_cors_headers() {
    let (app, _, _) = stub_app(Vec::new());

    let mut request = get("/");
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
