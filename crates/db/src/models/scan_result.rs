//! Scan result model and DTOs.
//!
//! Maps to the `scan_results` table: one row per image-on-page
//! observation, never mutated after insert, cascade-deleted with its
//! owning session.

use a11yscan_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `scan_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScanResult {
    pub id: DbId,
    pub session_id: String,
    pub page_id: DbId,
    pub page_title: String,
    pub page_url: String,
    pub page_type: String,
    pub page_modified_at: Timestamp,
    /// Numeric attachment id rendered as text, or the URL hash for
    /// virtual images.
    pub image_id: String,
    pub is_virtual: bool,
    pub image_url: String,
    pub image_filename: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub byte_size: Option<i64>,
    pub alt_status: String,
    pub title_status: String,
    pub alt_text: Option<String>,
    pub title_text: Option<String>,
    /// 1-based order of appearance on the page.
    pub position: i64,
    pub role: String,
    pub context_before: String,
    pub context_after: String,
    pub heading: Option<String>,
    pub caption: Option<String>,
    /// Deterministic remediation priority in `[0, 10]`.
    pub priority: i64,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for appending one scan result to a session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScanResult {
    pub session_id: String,
    pub page_id: DbId,
    pub page_title: String,
    pub page_url: String,
    pub page_type: String,
    pub page_modified_at: Timestamp,
    pub image_id: String,
    pub is_virtual: bool,
    pub image_url: String,
    pub image_filename: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub byte_size: Option<i64>,
    pub alt_status: String,
    pub title_status: String,
    pub alt_text: Option<String>,
    pub title_text: Option<String>,
    pub position: i64,
    pub role: String,
    pub context_before: String,
    pub context_after: String,
    pub heading: Option<String>,
    pub caption: Option<String>,
    pub priority: i64,
}

// ---------------------------------------------------------------------------
// Result filtering
// ---------------------------------------------------------------------------

/// Filter criteria for paginated result listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultFilter {
    /// Restrict to one alt status (`present` / `empty` / `missing`).
    pub alt_status: Option<String>,
    /// Restrict to one title status.
    pub title_status: Option<String>,
    /// Only rows at or above this priority.
    pub min_priority: Option<i64>,
    /// Restrict to one page type.
    pub page_type: Option<String>,
    /// Free-text search over page title, heading, and context snippets.
    pub search: Option<String>,
}

/// One page of filtered results plus pagination totals.
#[derive(Debug, Serialize)]
pub struct ResultPage {
    pub rows: Vec<ScanResult>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub page_size: i64,
}

// ---------------------------------------------------------------------------
// Aggregate statistics
// ---------------------------------------------------------------------------

/// Aggregate counts over one session's results.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScanStats {
    pub total_images: i64,
    pub missing_alt: i64,
    pub empty_alt: i64,
    pub missing_title: i64,
    pub empty_title: i64,
    /// Both alt and title are non-present.
    pub missing_both: i64,
    /// Priority bands: critical >= 8, high 6-7, medium 4-5, low < 4.
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    /// Distinct pages carrying at least one issue.
    pub pages_with_issues: i64,
}
