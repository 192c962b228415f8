//! Scan session model and DTOs.
//!
//! Maps to the `scan_sessions` table: one row per crawler run, holding
//! the fixed candidate page list, progress counters, and lifecycle state.

use a11yscan_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Scan is in progress; batches may still be processed.
pub const STATUS_RUNNING: &str = "running";
/// All batches processed.
pub const STATUS_COMPLETED: &str = "completed";
/// The scan was aborted by a persistent failure.
pub const STATUS_FAILED: &str = "failed";
/// The scan was cancelled by the caller; appended results remain.
pub const STATUS_CANCELLED: &str = "cancelled";

/// Terminal states never transition further.
pub const TERMINAL_STATUSES: &[&str] = &[STATUS_COMPLETED, STATUS_FAILED, STATUS_CANCELLED];

/// Whether a status string denotes a terminal session.
pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

// ---------------------------------------------------------------------------
// Scan mode constants
// ---------------------------------------------------------------------------

/// Scan the whole published corpus.
pub const MODE_FULL: &str = "full";
/// Scan a date-restricted slice of the corpus.
pub const MODE_PARTIAL: &str = "partial";
/// Scan one content type only.
pub const MODE_BY_TYPE: &str = "by-type";

pub const VALID_MODES: &[&str] = &[MODE_FULL, MODE_PARTIAL, MODE_BY_TYPE];

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `scan_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScanSession {
    pub id: String,
    pub scan_mode: String,
    pub status: String,
    pub pages_total: i64,
    pub pages_scanned: i64,
    pub pages_skipped: i64,
    pub images_found: i64,
    pub issues_found: i64,
    /// Serialized filter criteria the candidate list was resolved from.
    pub filters_json: String,
    /// JSON array of candidate page ids, fixed at creation.
    pub page_ids_json: String,
    pub triggered_by: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl ScanSession {
    /// Decode the fixed candidate page list.
    pub fn page_ids(&self) -> Result<Vec<DbId>, serde_json::Error> {
        serde_json::from_str(&self.page_ids_json)
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal_status(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for inserting a new scan session.
///
/// `pages_total` is derived from `page_ids` and fixed for the lifetime of
/// the session.
#[derive(Debug, Deserialize)]
pub struct CreateScanSession {
    pub scan_mode: String,
    pub filters_json: serde_json::Value,
    pub page_ids: Vec<DbId>,
    pub triggered_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Progress update DTO
// ---------------------------------------------------------------------------

/// Counter merge applied after each batch. Absolute values, last write
/// wins; concurrent batches on one session are out of contract.
#[derive(Debug, Deserialize)]
pub struct UpdateScanProgress {
    pub pages_scanned: i64,
    pub pages_skipped: i64,
    pub images_found: i64,
    pub issues_found: i64,
}
