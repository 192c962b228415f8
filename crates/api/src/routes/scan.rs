//! Route definitions for accessibility scans.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::scan;
use crate::state::AppState;

/// Scan routes mounted at `/scans`.
///
/// ```text
/// POST   /                 -> start_scan
/// GET    /                 -> list_scans
/// GET    /{id}             -> get_scan
/// DELETE /{id}             -> delete_scan
/// POST   /{id}/batch       -> process_batch
/// POST   /{id}/cancel      -> cancel_scan
/// GET    /{id}/results     -> get_results
/// GET    /{id}/stats       -> get_stats
/// GET    /{id}/export      -> export_csv
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(scan::start_scan).get(scan::list_scans))
        .route("/{id}", get(scan::get_scan).delete(scan::delete_scan))
        .route("/{id}/batch", post(scan::process_batch))
        .route("/{id}/cancel", post(scan::cancel_scan))
        .route("/{id}/results", get(scan::get_results))
        .route("/{id}/stats", get(scan::get_stats))
        .route("/{id}/export", get(scan::export_csv))
}
