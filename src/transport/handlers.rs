//! REST endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/log` | Publish one log entry to the default topic |
//! | `GET` | `/logs` | Most recent records across topics, filterable |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/dataset/info` | Seed dataset size and sample |
//! | `GET` | `/kaggle/{index}` | Publish one seed record |
//! | `POST` | `/kaggle/batch` | Publish a range of seed records |
//! | `GET` | `/topics` | Topic names and lengths |
//! | `GET` | `/topics/{topic}/records` | Offset range read over one topic |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::record::{LogCandidate, LogFilter, LogLevel};
use crate::transport::error::ApiError;
use crate::transport::state::AppState;
use crate::utils::error::{BrokerError, ValidationError};

const DEFAULT_LOGS_LIMIT: usize = 10;
const DEFAULT_RECORDS_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Query parameters for `GET /logs`.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub service: Option<String>,
    pub level: Option<String>,
}

/// Query parameters for `GET /topics/{topic}/records`.
#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub offset: Option<i64>,
    pub limit: Option<usize>,
}

/// Body of `POST /kaggle/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub start_index: usize,
    #[serde(default = "default_batch_count")]
    pub count: usize,
}

fn default_batch_count() -> usize {
    10
}

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).min(MAX_LIMIT)
}

pub async fn create_log(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<LogCandidate>,
) -> Result<Json<Value>, ApiError> {
    debug!(?candidate, "received log entry");

    let receipt = state
        .broker
        .publish(&state.topic, candidate)
        .inspect_err(|e| warn!(error = %e, "rejected log entry"))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Log entry accepted",
        "topic": receipt.topic,
        "offset": receipt.offset,
    })))
}

pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let level = query
        .level
        .as_deref()
        .filter(|level| !level.is_empty())
        .map(str::parse::<LogLevel>)
        .transpose()
        .map_err(BrokerError::from)?;

    let filter = LogFilter {
        service: query.service.filter(|service| !service.is_empty()),
        level,
    };
    let logs = state
        .broker
        .recent(clamp_limit(query.limit, DEFAULT_LOGS_LIMIT), &filter);

    Ok(Json(json!({
        "status": "success",
        "count": logs.len(),
        "logs": logs,
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "mode": "development" }))
}

pub async fn dataset_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "total_logs": state.dataset.len(),
        "sample": state.dataset.sample(3),
    }))
}

pub async fn send_dataset_record(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    info!(index, "sending dataset record");
    let candidate = state.dataset.get(index)?.clone();
    let receipt = state.broker.publish(&state.topic, candidate)?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("Kaggle log at index {index} sent"),
        "offset": receipt.offset,
    })))
}

pub async fn send_dataset_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, ApiError> {
    info!(
        start_index = request.start_index,
        count = request.count,
        "sending dataset batch"
    );
    let range = state.dataset.batch_range(request.start_index, request.count)?;

    let mut success_count = 0usize;
    for index in range {
        let candidate = state.dataset.get(index)?.clone();
        match state.broker.publish(&state.topic, candidate) {
            Ok(_) => success_count += 1,
            Err(e) => warn!(index, error = %e, "dataset record rejected"),
        }
    }

    if success_count == 0 {
        return Err(ApiError::Internal(format!(
            "Successfully sent 0/{} logs",
            request.count
        )));
    }

    Ok(Json(json!({
        "status": "success",
        "message": format!("Sent {success_count} logs"),
        "success_count": success_count,
    })))
}

pub async fn list_topics(State(state): State<Arc<AppState>>) -> Json<Value> {
    let topics: Vec<Value> = state
        .broker
        .list_topics()
        .into_iter()
        .map(|name| {
            let length = state.broker.topic_len(&name);
            json!({ "name": name, "length": length })
        })
        .collect();

    Json(json!({
        "status": "success",
        "topics": topics,
    }))
}

pub async fn read_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Value>, ApiError> {
    if topic.trim().is_empty() {
        return Err(BrokerError::from(ValidationError::EmptyTopic).into());
    }
    let records = state.broker.read_from(
        &topic,
        query.offset.unwrap_or(0),
        clamp_limit(query.limit, DEFAULT_RECORDS_LIMIT),
    )?;

    Ok(Json(json!({
        "status": "success",
        "topic": topic,
        "count": records.len(),
        "records": records,
    })))
}

