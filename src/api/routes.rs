//! API route definitions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use crate::scheduler::countdown::countdown_until;
use crate::scheduler::JobError;

/// Default number of history entries returned by `/results/history`.
const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}/run", post(run_job))
        .route("/results", get(all_results).delete(clear_results))
        .route("/results/summary", get(results_summary))
        .route("/results/history", get(results_history))
        .route("/results/debug", get(results_debug))
        .route(
            "/results/{id}",
            get(job_result).post(report_result).delete(clear_job_result),
        )
}

type ApiError = (StatusCode, Json<Value>);

fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "data": null, "meta": { "error": message.into() } })),
    )
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let summary = state.store.summary().await;
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "results": summary.total,
            "last_execution_time": summary.last_execution_time,
        },
        "meta": {
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Value> {
    let now = Utc::now();
    let latest = state.store.all_latest().await;

    let jobs: Vec<Value> = state
        .dispatcher
        .catalog()
        .jobs()
        .into_iter()
        .map(|job| {
            let next_run = state.calculator.next_run_for(&job, now);
            json!({
                "id": job.id,
                "name": job.name,
                "active": job.active,
                "rule": job.rule,
                "schedule": state.calculator.describe(job.rule),
                "next_run": next_run.map(|at| at.to_rfc3339()),
                "countdown": next_run.map(|at| countdown_until(at, now)),
                "last_status": latest.get(&job.id).map(|r| r.status),
            })
        })
        .collect();

    let total = jobs.len();
    Json(json!({ "data": jobs, "meta": { "total": total } }))
}

async fn run_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.dispatcher.run_now(&id).await {
        Ok(result) => Ok(Json(json!({ "data": result, "meta": { "forced": true } }))),
        Err(e @ JobError::NotFound { .. }) => Err(not_found(e.to_string())),
    }
}

async fn all_results(State(state): State<AppState>) -> Json<Value> {
    let latest = state.store.all_latest().await;
    let total = latest.len();
    Json(json!({ "data": latest, "meta": { "total": total } }))
}

async fn clear_results(State(state): State<AppState>) -> Json<Value> {
    state.store.clear().await;
    Json(json!({ "data": null, "meta": { "message": "all results cleared" } }))
}

async fn results_summary(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "data": state.store.summary().await }))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn results_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let entries = state.store.history(limit).await;
    let total = entries.len();
    Json(json!({ "data": entries, "meta": { "total": total, "limit": limit } }))
}

async fn results_debug(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "data": state.store.debug_state().await }))
}

async fn job_result(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    match state.store.latest(&id).await {
        Some(result) => Json(json!({ "data": result })),
        None => Json(json!({ "data": null, "meta": { "message": "no data yet" } })),
    }
}

async fn report_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(raw): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let stored = state.store.record_raw(&id, &raw).await;
    (StatusCode::CREATED, Json(json!({ "data": stored })))
}

async fn clear_job_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.store.clear_one(&id).await {
        Ok(Json(json!({ "data": null, "meta": { "message": format!("cleared result for '{id}'") } })))
    } else {
        Err(not_found(format!("no result stored for '{id}'")))
    }
}
