//! End-to-end tests of the HTTP surface
//!
//! Drives the axum router with `tower::ServiceExt::oneshot`, using bundles
//! exported to a temporary artifact directory and a TOML configuration.

#![cfg(feature = "server")]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use prever::{
    api::{create_router, AppState},
    config::ServeConfig,
    demo,
    model::Predictor,
    pipeline::Pipeline,
    registry::PipelineRegistry,
    schema::{schema_for, Vertical},
    transform::TransformChain,
};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("test");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("test");
    (status, serde_json::from_slice(&body).expect("test"))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("test")
}

fn liver_low() -> Value {
    json!({
        "Age": 30, "Gender": 0, "BMI": 22, "AlcoholConsumption": 2, "Smoking": 0,
        "GeneticRisk": 0, "PhysicalActivity": 6, "Diabetes": 0, "Hypertension": 0,
        "LiverFunctionTest": 40
    })
}

fn crop_json() -> Value {
    json!({
        "Nitrogen": "90", "Phosphorus": "42", "Potassium": "43", "Temperature": "20.8",
        "Humidity": "82.0", "pH": "6.5", "Rainfall": "202.9"
    })
}

// =============================================================================
// Configured server over exported artifacts
// =============================================================================

#[tokio::test]
async fn test_config_selects_served_verticals() {
    let dir = tempfile::tempdir().expect("test");
    demo::export(dir.path()).expect("test");
    let config = ServeConfig::from_toml(&format!(
        "artifacts_dir = \"{}\"\nverticals = [\"crop\", \"liver\"]\nmax_batch_rows = 50\n",
        dir.path().display()
    ))
    .expect("test");
    let registry = PipelineRegistry::load(&config.artifacts_dir, &config.verticals);
    let app = create_router(AppState::new(registry, config));

    let (status, json) = send(app.clone(), post_json("/v1/crop/predict", &crop_json())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["crop"], "Rice");

    let (status, json) = send(app.clone(), post_json("/v1/liver/predict", &liver_low())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"], "Absent");

    let (status, _) = send(app, post_json("/v1/diabetes/predict", &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_liver_high_risk_present() {
    let mut body = liver_low();
    body["AlcoholConsumption"] = json!(20);
    body["Smoking"] = json!(1);
    body["GeneticRisk"] = json!(2);
    body["LiverFunctionTest"] = json!(90);
    let app = create_router(AppState::demo());
    let (status, json) = send(app, post_json("/v1/liver/predict", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["prediction"], "Present");
    assert_eq!(json["prediction_code"], 1);
}

#[tokio::test]
async fn test_vertical_name_is_case_insensitive() {
    let app = create_router(AppState::demo());
    let (status, json) = send(app, post_json("/v1/Crop/predict", &crop_json())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["crop"], "Rice");
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_requests_share_state() {
    let state = AppState::demo();
    let app = create_router(state.clone());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { send(app, post_json("/v1/crop/predict", &crop_json())).await })
        })
        .collect();

    let mut bodies = Vec::new();
    for handle in handles {
        let (status, json) = handle.await.expect("test");
        assert_eq!(status, StatusCode::OK);
        bodies.push(json);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));

    let snapshot = state.metrics().snapshot();
    assert_eq!(snapshot.total_requests, 16);
    assert_eq!(snapshot.successful_requests, 16);
}

// =============================================================================
// Model faults
// =============================================================================

#[derive(Debug)]
struct PanickingModel {
    feature_names: Vec<String>,
    classes: Vec<i64>,
}

impl Predictor for PanickingModel {
    fn kind(&self) -> &'static str {
        "panicking"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict(&self, _features: &[f64]) -> prever::Result<f64> {
        panic!("corrupt weights")
    }
}

#[tokio::test]
async fn test_model_fault_is_500_with_generic_message() {
    let schema = schema_for(Vertical::Liver);
    let model = PanickingModel {
        feature_names: schema.feature_column_names(),
        classes: vec![0, 1],
    };
    let pipeline = Pipeline::new(schema, TransformChain::new(Vec::new()), Box::new(model))
        .expect("test");
    let mut registry = PipelineRegistry::new();
    registry.insert(Vertical::Liver, Ok(pipeline));
    let state = AppState::new(registry, ServeConfig::default());
    let app = create_router(state.clone());

    let (status, json) = send(app, post_json("/v1/liver/predict", &liver_low())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        json!({
            "success": false,
            "error_kind": "ModelInferenceFault",
            "errors": {"general": "Prediction failed"}
        })
    );
    assert_eq!(state.metrics().snapshot().failed_requests, 1);
}
