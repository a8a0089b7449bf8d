//! End-to-end tests for `POST /predict`.
//!
//! Each test builds a scoring engine from small in-memory artifacts, mounts
//! it on the router and drives requests through it with `oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use credit_risk_service::metrics::ServiceMetrics;
use credit_risk_service::models::{LogisticRegression, ModelArtifacts, StandardScaler};
use credit_risk_service::{build_router, AppState, EncodingPolicy, ScoringEngine};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn app_with(artifacts: ModelArtifacts, policy: EncodingPolicy) -> (Arc<AppState>, Router) {
    let engine = ScoringEngine::new(artifacts, policy);
    let state = Arc::new(AppState::new(engine, Arc::new(ServiceMetrics::new())));
    (state.clone(), build_router(state))
}

/// Two numeric columns, identity scaler.
fn simple_app() -> (Arc<AppState>, Router) {
    app_with(
        ModelArtifacts {
            classifier: LogisticRegression::new(vec![0.8, -0.3], 0.1),
            scaler: StandardScaler::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap(),
            columns: columns(&["a", "b"]),
        },
        EncodingPolicy::DropFirst,
    )
}

/// Numeric column plus indicator columns for EDUCATION.
fn categorical_artifacts() -> ModelArtifacts {
    ModelArtifacts {
        classifier: LogisticRegression::new(vec![0.0, 3.0, -3.0], 0.0),
        scaler: StandardScaler::new(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]).unwrap(),
        columns: columns(&["AGE", "EDUCATION_high_school", "EDUCATION_university"]),
    }
}

async fn post_predict(app: Router, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn expected(classifier: &LogisticRegression, row: &[f64]) -> (i64, f64) {
    let proba = classifier.predict_proba(row).unwrap();
    (
        classifier.predict(row).unwrap(),
        (proba * 10_000.0).round_ties_even() / 10_000.0,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_predict_matches_classifier_output() {
    let (_, app) = simple_app();
    let classifier = LogisticRegression::new(vec![0.8, -0.3], 0.1);

    let (status, body) = post_predict(app, json!({"data": {"a": 1, "b": 2}})).await;

    assert_eq!(status, StatusCode::OK);
    let (label, probability) = expected(&classifier, &[1.0, 2.0]);
    assert_eq!(body["prediction"], label);
    assert_eq!(body["probability"].as_f64().unwrap(), probability);
    // 0.8 - 0.6 + 0.1 = 0.3 -> sigmoid 0.574442...
    assert_eq!(body, json!({"prediction": 1, "probability": 0.5744}));
}

#[tokio::test]
async fn test_response_has_only_prediction_and_probability() {
    let (_, app) = simple_app();

    let (_, body) = post_predict(app, json!({"data": {"a": -4}})).await;

    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert!(object.contains_key("prediction"));
    assert!(object.contains_key("probability"));
}

#[tokio::test]
async fn test_unknown_and_missing_features_do_not_fail() {
    let (state, app) = simple_app();

    let (status, body) = post_predict(
        app,
        json!({"data": {"zzz": 7, "comment": "hello", "nested": {"x": 1}}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // all-zero row -> decision 0.1
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["probability"].as_f64().unwrap(), 0.525);
    assert_eq!(state.metrics.requests_scored.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_empty_data_scores_zero_row() {
    let (_, app) = simple_app();

    let (status, body) = post_predict(app, json!({"data": {}})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["probability"].as_f64().unwrap(), 0.525);
}

#[tokio::test]
async fn test_probability_is_rounded_and_bounded() {
    for (a, b) in [(50.0, 0.0), (-50.0, 0.0), (0.123, 4.56), (3.3, -1.1)] {
        let (_, app) = simple_app();
        let (status, body) = post_predict(app, json!({"data": {"a": a, "b": b}})).await;

        assert_eq!(status, StatusCode::OK);
        let p = body["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!((p * 10_000.0).round() / 10_000.0, p);
    }
}

#[tokio::test]
async fn test_categorical_dropped_under_drop_first() {
    let (_, app) = app_with(categorical_artifacts(), EncodingPolicy::DropFirst);

    let (status, body) = post_predict(
        app,
        json!({"data": {"AGE": 40, "EDUCATION": "high_school"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": 0, "probability": 0.5}));
}

#[tokio::test]
async fn test_categorical_reaches_model_under_indicator() {
    let (_, app) = app_with(categorical_artifacts(), EncodingPolicy::Indicator);

    let (status, body) = post_predict(
        app,
        json!({"data": {"AGE": 40, "EDUCATION": "high_school"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 1);
    // sigmoid(3.0) = 0.952574...
    assert_eq!(body["probability"].as_f64().unwrap(), 0.9526);
}

#[tokio::test]
async fn test_shape_mismatch_returns_server_error() {
    let (state, app) = app_with(
        ModelArtifacts {
            classifier: LogisticRegression::new(vec![1.0, 1.0], 0.0),
            scaler: StandardScaler::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap(),
            columns: columns(&["a", "b", "c"]),
        },
        EncodingPolicy::DropFirst,
    );

    let (status, body) = post_predict(app, json!({"data": {"a": 1}})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "scoring_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("expected 2 features, got 3"));
    assert_eq!(state.metrics.requests_failed.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_nan_probability_returns_server_error() {
    let (state, app) = app_with(
        ModelArtifacts {
            classifier: LogisticRegression::new(vec![2.0, -2.0], 0.0),
            scaler: StandardScaler::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap(),
            columns: columns(&["a", "b"]),
        },
        EncodingPolicy::DropFirst,
    );

    let (status, body) = post_predict(app, json!({"data": {"a": 1e308, "b": 1e308}})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "scoring_error");
    assert!(body.get("probability").is_none());
    assert_eq!(state.metrics.requests_failed.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_body_without_data_is_rejected() {
    let (state, app) = simple_app();

    let (status, _) = post_predict(app, json!({"records": {"a": 1}})).await;

    assert!(status.is_client_error());
    assert_eq!(state.metrics.requests_scored.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_data_must_be_an_object() {
    let (_, app) = simple_app();

    let (status, _) = post_predict(app, json!({"data": [1, 2]})).await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_other_routes_are_not_served() {
    let (_, app) = simple_app();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let req = Request::builder()
        .method("GET")
        .uri("/predict")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
