// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection endpoint tests
//!
//! These tests drive the full router with a stub detector and verify:
//! - Detections are returned with names, scores and pixel boxes
//! - An image with nothing in it yields an empty list
//! - Boxes are well-formed and confidences stay in [0, 1]
//! - Repeated calls return the same result
//! - Uploads are released once the request completes
//! - Overlapping requests share one model safely

use axum::http::StatusCode;
use tower::util::ServiceExt; // for `oneshot`

use crate::common::{
    detect_request, json_body, multipart_body, png_bytes, prediction, stub_app, upload_request,
};

#[tokio::test]
async fn test_detect_returns_detections() {
    let (app, detector, state) = stub_app(vec![
        prediction(0, 0.91, [10.0, 12.0, 40.0, 60.0]),
        prediction(2, 0.55, [5.0, 70.0, 30.0, 90.0]),
    ]);

    let response = app
        .oneshot(upload_request("image/png", &png_bytes(100, 100)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let detections = body["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 2);

    assert_eq!(detections[0]["class_id"], 0);
    assert_eq!(detections[0]["class_name"], "shirt");
    assert!((detections[0]["confidence"].as_f64().unwrap() - 0.91).abs() < 1e-6);
    assert_eq!(
        detections[0]["bounding_box"],
        serde_json::json!([10.0, 12.0, 40.0, 60.0])
    );
    assert_eq!(detections[1]["class_name"], "sneakers");

    assert_eq!(detector.calls(), 1);
    assert_eq!(state.uploads.opened_total(), 1);
    assert_eq!(state.uploads.held(), 0);
}

#[tokio::test]
async fn test_detect_without_trailing_slash() {
    let (app, _, _) = stub_app(vec![prediction(1, 0.6, [0.0, 0.0, 8.0, 8.0])]);

    let mut request = upload_request("image/png", &png_bytes(16, 16));
    *request.uri_mut() = "/detect".parse().unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["detections"][0]["class_name"], "jeans");
}

#[tokio::test]
async fn test_empty_image_returns_empty_list() {
    let (app, detector, _) = stub_app(Vec::new());

    let response = app
        .oneshot(upload_request("image/png", &png_bytes(32, 32)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({"detections": []}));
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_boxes_and_confidences_are_well_formed() {
    let (app, _, _) = stub_app(vec![
        // Corners reported in the wrong order
        prediction(0, 0.8, [50.0, 60.0, 10.0, 20.0]),
        // Score outside [0, 1]
        prediction(1, 1.2, [0.0, 0.0, 5.0, 5.0]),
        // Box reaching past the image edge
        prediction(2, 0.3, [-4.0, -4.0, 500.0, 500.0]),
    ]);

    let response = app
        .oneshot(upload_request("image/png", &png_bytes(64, 64)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    for detection in body["detections"].as_array().unwrap() {
        let bbox: Vec<f64> = detection["bounding_box"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert!(bbox[0] <= bbox[2], "xmin > xmax in {:?}", bbox);
        assert!(bbox[1] <= bbox[3], "ymin > ymax in {:?}", bbox);
        assert!(bbox.iter().all(|v| (0.0..=64.0).contains(v)));

        let confidence = detection["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
    }
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let (app, _, _) = stub_app(vec![
        prediction(1, 0.7, [3.0, 4.0, 20.0, 22.0]),
        prediction(0, 0.4, [30.0, 30.0, 45.0, 50.0]),
    ]);
    let image = png_bytes(64, 64);

    let first = json_body(
        app.clone()
            .oneshot(upload_request("image/png", &image))
            .await
            .unwrap(),
    )
    .await;
    let second = json_body(
        app.oneshot(upload_request("image/png", &image))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_content_type_check_is_case_insensitive() {
    let (app, detector, _) = stub_app(Vec::new());

    let response = app
        .oneshot(upload_request("IMAGE/PNG", &png_bytes(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_file_field_found_by_file_name() {
    let (app, detector, _) = stub_app(Vec::new());

    let body = multipart_body("image", "photo.png", "image/png", &png_bytes(8, 8));
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(detector.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_model() {
    const REQUESTS: usize = 12;

    let (app, detector, state) = stub_app(vec![
        prediction(0, 0.9, [4.0, 4.0, 30.0, 40.0]),
        prediction(1, 0.5, [10.0, 2.0, 20.0, 12.0]),
    ]);
    let image = png_bytes(48, 48);

    let tasks: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let app = app.clone();
            let image = image.clone();
            tokio::spawn(async move {
                let response = app
                    .oneshot(upload_request("image/png", &image))
                    .await
                    .unwrap();
                (response.status(), json_body(response).await)
            })
        })
        .collect();

    let mut bodies = Vec::new();
    for task in tasks {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        bodies.push(body);
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(bodies[0]["detections"].as_array().unwrap().len(), 2);
    assert_eq!(detector.calls(), REQUESTS);
    assert_eq!(state.uploads.opened_total(), REQUESTS as u64);
    assert_eq!(state.uploads.held(), 0);
}
