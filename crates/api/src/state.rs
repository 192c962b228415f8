use std::sync::Arc;

use a11yscan_scanner::ScanOrchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: a11yscan_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Scan session orchestrator (holds the content repository).
    pub orchestrator: Arc<ScanOrchestrator>,
}
