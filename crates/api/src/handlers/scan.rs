//! Handlers for accessibility scan endpoints.
//!
//! Scan lifecycle (start / batch / cancel / delete) goes through the
//! orchestrator; listing, statistics, and export read the store directly.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use a11yscan_core::classify::AttributeStatus;
use a11yscan_core::content::PageFilter;
use a11yscan_core::export::{render_csv, ReportRow};
use a11yscan_core::types::Timestamp;
use a11yscan_db::models::scan_result::{ResultFilter, ResultPage, ScanResult, ScanStats};
use a11yscan_db::models::scan_session::ScanSession;
use a11yscan_db::repositories::{clamp_page_size, ScanResultRepo, ScanSessionRepo};
use a11yscan_scanner::{BatchOutcome, ScanError, StartOutcome};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for starting a scan.
#[derive(Debug, Deserialize)]
pub struct StartScanRequest {
    pub mode: String,
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub modified_after: Option<Timestamp>,
    #[serde(default)]
    pub triggered_by: Option<String>,
}

/// Request body for processing one batch.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub batch_start: i64,
    pub batch_size: i64,
}

/// Query parameters for filtered result listing.
#[derive(Debug, Deserialize)]
pub struct ResultQueryParams {
    pub alt_status: Option<String>,
    pub title_status: Option<String>,
    pub min_priority: Option<i64>,
    pub page_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Look up a session or return a 404.
async fn ensure_session_exists(
    pool: &a11yscan_db::DbPool,
    id: &str,
) -> AppResult<ScanSession> {
    ScanSessionRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Scan(ScanError::SessionNotFound(id.to_string())))
}

// ---------------------------------------------------------------------------
// Lifecycle handlers
// ---------------------------------------------------------------------------

/// `POST /scans` - start a new scan session.
pub async fn start_scan(
    State(state): State<AppState>,
    Json(body): Json<StartScanRequest>,
) -> AppResult<Json<DataResponse<StartOutcome>>> {
    let filter = PageFilter {
        page_type: body.page_type,
        modified_after: body.modified_after,
    };
    let outcome = state
        .orchestrator
        .start(&body.mode, &filter, body.triggered_by)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// `POST /scans/{id}/batch` - process one batch of the candidate list.
pub async fn process_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BatchRequest>,
) -> AppResult<Json<DataResponse<BatchOutcome>>> {
    let outcome = state
        .orchestrator
        .process_batch(&id, body.batch_start, body.batch_size)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// `POST /scans/{id}/cancel` - cancel a running scan.
pub async fn cancel_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ScanSession>>> {
    let session = state.orchestrator.cancel(&id).await?;
    Ok(Json(DataResponse { data: session }))
}

/// `DELETE /scans/{id}` - remove a session and all of its results.
pub async fn delete_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.orchestrator.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Read handlers
// ---------------------------------------------------------------------------

/// `GET /scans` - paginated session listing, newest first.
pub async fn list_scans(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ScanSession>>>> {
    let limit = clamp_page_size(params.limit);
    let offset = params.offset.unwrap_or(0).max(0);
    let sessions = ScanSessionRepo::list_all(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// `GET /scans/{id}` - one session with its counters.
pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ScanSession>>> {
    let session = ensure_session_exists(&state.pool, &id).await?;
    Ok(Json(DataResponse { data: session }))
}

/// `GET /scans/{id}/results` - filtered, paginated result rows.
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ResultQueryParams>,
) -> AppResult<Json<DataResponse<ResultPage>>> {
    ensure_session_exists(&state.pool, &id).await?;
    let filter = ResultFilter {
        alt_status: params.alt_status,
        title_status: params.title_status,
        min_priority: params.min_priority,
        page_type: params.page_type,
        search: params.search,
    };
    let page = ScanResultRepo::list(&state.pool, &id, &filter, params.page, params.page_size)
        .await?;
    Ok(Json(DataResponse { data: page }))
}

/// `GET /scans/{id}/stats` - aggregate counts for one session.
pub async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ScanStats>>> {
    ensure_session_exists(&state.pool, &id).await?;
    let stats = ScanResultRepo::stats(&state.pool, &id).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// `GET /scans/{id}/export` - download the session's results as CSV.
pub async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    ensure_session_exists(&state.pool, &id).await?;
    let results = ScanResultRepo::list_for_session(&state.pool, &id).await?;
    let rows: Vec<ReportRow> = results.into_iter().map(report_row).collect();
    let bytes = render_csv(&rows).map_err(AppError::Core)?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"scan-{id}.csv\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Flatten a stored result row for CSV rendering.
fn report_row(row: ScanResult) -> ReportRow {
    ReportRow {
        page_title: row.page_title,
        page_url: row.page_url,
        page_type: row.page_type,
        image_filename: row.image_filename,
        image_url: row.image_url,
        width: row.width,
        height: row.height,
        byte_size: row.byte_size,
        alt_status: AttributeStatus::parse(&row.alt_status).unwrap_or(AttributeStatus::Missing),
        title_status: AttributeStatus::parse(&row.title_status)
            .unwrap_or(AttributeStatus::Missing),
        alt_text: row.alt_text,
        title_text: row.title_text,
        priority: row.priority,
        position: row.position,
        role: row.role,
        heading: row.heading,
        context_before: row.context_before,
        context_after: row.context_after,
        caption: row.caption,
        last_modified: row.page_modified_at,
    }
}
