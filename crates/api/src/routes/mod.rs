//! Route definitions, grouped by resource.

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod scan;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/scans", scan::router())
}
