//! REST routes for the registry.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::domain::{RecordDraft, RecordId};
use crate::orchestrator::RecordOrchestrator;

use super::error::{ApiError, ErrorCode};
use super::types::{
    AvailabilityResponse, DecryptResponse, ListRecordsResponse, ListRecordsQuery, RecordResponse,
    StatusResponse,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RecordOrchestrator>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/availability", get(check_availability))
        .route("/status", get(current_status))
        .route("/records", get(list_records).post(create_record))
        .route("/records/:id", get(get_record))
        .route("/records/:id/decrypt", post(decrypt_record))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn check_availability(
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let available = state.orchestrator.check_availability().await?;
    Ok(Json(AvailabilityResponse { available }))
}

async fn current_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        notice: state.orchestrator.status().current(),
        creating: state.orchestrator.is_creating(),
        decrypting: state.orchestrator.is_decrypting(),
    })
}

async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<ListRecordsResponse>, ApiError> {
    // Serve from the reconciled cache after a best-effort refresh; a
    // failed read degrades to the stale list rather than erroring.
    state.orchestrator.refresh().await;
    let records = state
        .orchestrator
        .filtered_records(query.filter, query.search.as_deref())
        .await;
    let stats = state.orchestrator.stats().await;
    Ok(Json(ListRecordsResponse {
        records: records.into_iter().map(RecordResponse::from).collect(),
        stats,
    }))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, ApiError> {
    let records = state.orchestrator.records().await;
    match records.into_iter().find(|r| r.id.as_str() == id) {
        Some(record) => Ok(Json(record.into())),
        None => Err(
            ApiError::new(ErrorCode::RecordNotFound, format!("record not found: {}", id))
                .with_resource_id(id),
        ),
    }
}

async fn create_record(
    State(state): State<AppState>,
    Json(draft): Json<RecordDraft>,
) -> Result<Json<RecordResponse>, ApiError> {
    if draft.name.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::InvalidFieldValue,
            "name must not be empty",
        ));
    }
    let record = state.orchestrator.create_record(draft).await?;
    Ok(Json(record.into()))
}

async fn decrypt_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let record_id = RecordId::from(id.as_str());
    let clear_value = state.orchestrator.decrypt_record(&record_id).await?;
    Ok(Json(DecryptResponse { id, clear_value }))
}
