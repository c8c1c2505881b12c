//! Endpoint handlers

use std::{collections::HashMap, time::Instant};

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{
    types::{
        CategoriesResponse, ErrorResponse, HealthResponse, ReadyResponse, VerticalDescription,
        VerticalsResponse,
    },
    ApiError, AppState,
};
use crate::{
    batch,
    error::PreverError,
    pipeline::PREDICTION_FAILED,
    schema::{schema_for, Vertical},
    validate::RawRecord,
};

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::general(message)))
}

fn parse_vertical(name: &str) -> Result<Vertical, ApiError> {
    name.parse()
        .map_err(|e: PreverError| error(StatusCode::NOT_FOUND, e.to_string()))
}

// ============================================================================
// Prediction
// ============================================================================

/// Body of a prediction request
enum Submission {
    /// Scalar fields of one record
    Record(RawRecord),
    /// Contents of an uploaded CSV file
    Csv(Vec<u8>),
}

async fn read_submission(request: Request, state: &AppState) -> Result<Submission, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let bad_request = |message: String| error(StatusCode::BAD_REQUEST, message);

    if content_type.starts_with("application/json") {
        let Json(value) = Json::<serde_json::Value>::from_request(request, state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        return match value {
            serde_json::Value::Object(map) => Ok(Submission::Record(RawRecord::from(map))),
            _ => Err(bad_request("Request body must be a JSON object.".to_string())),
        };
    }

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        let mut record = RawRecord::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_ascii_lowercase();
                // Unused file input on a manual-entry form
                if file_name.is_empty() {
                    continue;
                }
                if !file_name.ends_with(".csv") {
                    return Err(bad_request("Only CSV files allowed.".to_string()));
                }
                let bytes = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
                return Ok(Submission::Csv(bytes.to_vec()));
            }
            let text = field.text().await.map_err(|e| bad_request(e.body_text()))?;
            record.insert(name, text);
        }
        return Ok(Submission::Record(record));
    }

    let Form(fields) = Form::<HashMap<String, String>>::from_request(request, state)
        .await
        .map_err(|e| bad_request(e.body_text()))?;
    Ok(Submission::Record(fields.into_iter().collect()))
}

/// Prediction handler (`POST /v1/:vertical/predict`)
///
/// Accepts form fields, a JSON object, or a multipart upload whose `file`
/// part is a CSV batch.
pub(crate) async fn predict_handler(
    State(state): State<AppState>,
    Path(vertical): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let vertical = parse_vertical(&vertical)?;
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id, %vertical);

    async move {
        let pipeline = state.registry.get(vertical).map_err(|e| match e {
            PreverError::UnknownVertical(_) => error(StatusCode::NOT_FOUND, e.to_string()),
            _ => error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        })?;
        let submission = read_submission(request, &state).await?;
        let start = Instant::now();

        match submission {
            Submission::Record(raw) => {
                let result = pipeline.run(&raw);
                let status = StatusCode::from_u16(result.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                state.metrics.record_outcome(result.outcome());
                state
                    .metrics
                    .record_request(status.is_success(), start.elapsed());
                info!(
                    outcome = %result.outcome(),
                    status = status.as_u16(),
                    latency_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Prediction"
                );
                Ok((status, Json(result)).into_response())
            }
            Submission::Csv(bytes) => {
                let max_rows = state.config.max_batch_rows;
                let report = tokio::task::spawn_blocking(move || {
                    batch::run_csv(&pipeline, &bytes, max_rows)
                })
                .await
                .map_err(|e| {
                    state.metrics.record_request(false, start.elapsed());
                    warn!(error = %e, "Batch task failed");
                    error(StatusCode::INTERNAL_SERVER_ERROR, PREDICTION_FAILED)
                })?;
                match report {
                    Ok(report) => {
                        for result in &report.results {
                            state.metrics.record_outcome(result.outcome());
                        }
                        state.metrics.record_batch_rows(report.total_rows());
                        state.metrics.record_request(true, start.elapsed());
                        info!(
                            rows = report.total_rows(),
                            failed = report.failed(),
                            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "Batch prediction"
                        );
                        Ok((StatusCode::OK, Json(report)).into_response())
                    }
                    Err(err) => {
                        state.metrics.record_request(false, start.elapsed());
                        warn!(error = %err, "Batch rejected");
                        Ok((StatusCode::BAD_REQUEST, Json(err)).into_response())
                    }
                }
            }
        }
    }
    .instrument(span)
    .await
}

// ============================================================================
// Auxiliary endpoints
// ============================================================================

/// Output categories (`GET /v1/:vertical/categories`)
pub(crate) async fn categories_handler(
    Path(vertical): Path<String>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let vertical = parse_vertical(&vertical)?;
    let labels = schema_for(vertical).labels;
    Ok(Json(CategoriesResponse {
        vertical,
        categories: labels.iter().collect(),
        total: labels.len(),
    }))
}

/// Configured verticals (`GET /v1/verticals`)
pub(crate) async fn verticals_handler(State(state): State<AppState>) -> Json<VerticalsResponse> {
    let verticals = state
        .registry
        .status()
        .into_iter()
        .map(|status| {
            let schema = schema_for(status.vertical);
            VerticalDescription {
                vertical: status.vertical,
                loaded: status.loaded,
                reason: status.reason,
                fields: schema.fields,
                derived_features: schema.derived,
                feature_columns: schema.feature_columns,
                response_key: schema.response_key,
            }
        })
        .collect();
    Json(VerticalsResponse { verticals })
}

/// Health check (`GET /health`); always 200
pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.registry.health(),
        version: crate::VERSION.to_string(),
        models_loaded: state.registry.loaded_count(),
        verticals: state.registry.status(),
    })
}

/// Readiness (`GET /ready`); 503 until every configured vertical is loaded
pub(crate) async fn ready_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadyResponse>) {
    let ready = state.registry.all_loaded();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            ready,
            loaded: state.registry.loaded_count(),
            configured: state.registry.len(),
        }),
    )
}

/// Prometheus metrics (`GET /metrics`)
pub(crate) async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.to_prometheus()
}

/// Unmatched routes
pub(crate) async fn not_found_handler() -> ApiError {
    error(StatusCode::NOT_FOUND, "Endpoint not found")
}
