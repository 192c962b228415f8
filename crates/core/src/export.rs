//! CSV rendering of scan results.
//!
//! A pure formatting step over result rows: one header row plus one data
//! row per scan result, UTF-8. Column order is part of the report contract
//! and covered by tests.

use serde::Serialize;

use crate::classify::{priority_label, AttributeStatus};
use crate::error::CoreError;
use crate::types::Timestamp;

/// One row of the exported report, already flattened for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub page_title: String,
    pub page_url: String,
    pub page_type: String,
    pub image_filename: String,
    pub image_url: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub byte_size: Option<i64>,
    pub alt_status: AttributeStatus,
    pub title_status: AttributeStatus,
    pub alt_text: Option<String>,
    pub title_text: Option<String>,
    pub priority: i64,
    pub position: i64,
    pub role: String,
    pub heading: Option<String>,
    pub context_before: String,
    pub context_after: String,
    pub caption: Option<String>,
    pub last_modified: Timestamp,
}

/// Header row, in report column order.
pub const CSV_HEADERS: &[&str] = &[
    "Page Title",
    "Page URL",
    "Page Type",
    "Image Filename",
    "Image URL",
    "Dimensions / Size",
    "Alt Status",
    "Title Status",
    "Current Alt",
    "Current Title",
    "Priority",
    "Priority Score",
    "Position",
    "Role",
    "Heading",
    "Context Before",
    "Context After",
    "Caption",
    "Last Modified",
    "Issues",
];

/// `"800x600 (117 KB)"`, omitting whichever parts are unknown.
fn format_dimensions(width: Option<i64>, height: Option<i64>, byte_size: Option<i64>) -> String {
    let dims = match (width, height) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "unknown".to_string(),
    };
    match byte_size {
        Some(bytes) => format!("{dims} ({} KB)", bytes / 1024),
        None => dims,
    }
}

/// Short summary of what is wrong with the image, e.g.
/// `"missing alt; empty title"`, or `"none"` when both attributes pass.
pub fn issues_summary(alt_status: AttributeStatus, title_status: AttributeStatus) -> String {
    let mut issues = Vec::new();
    if alt_status.is_issue() {
        issues.push(format!("{} alt", alt_status.as_str()));
    }
    if title_status.is_issue() {
        issues.push(format!("{} title", title_status.as_str()));
    }
    if issues.is_empty() {
        "none".to_string()
    } else {
        issues.join("; ")
    }
}

/// Render rows to a UTF-8 CSV document.
pub fn render_csv(rows: &[ReportRow]) -> Result<Vec<u8>, CoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| CoreError::Internal(format!("CSV write failed: {e}")))?;

    for row in rows {
        writer
            .write_record([
                row.page_title.as_str(),
                row.page_url.as_str(),
                row.page_type.as_str(),
                row.image_filename.as_str(),
                row.image_url.as_str(),
                &format_dimensions(row.width, row.height, row.byte_size),
                row.alt_status.as_str(),
                row.title_status.as_str(),
                row.alt_text.as_deref().unwrap_or(""),
                row.title_text.as_deref().unwrap_or(""),
                priority_label(row.priority),
                &row.priority.to_string(),
                &row.position.to_string(),
                row.role.as_str(),
                row.heading.as_deref().unwrap_or(""),
                row.context_before.as_str(),
                row.context_after.as_str(),
                row.caption.as_deref().unwrap_or(""),
                &row.last_modified.to_rfc3339(),
                &issues_summary(row.alt_status, row.title_status),
            ])
            .map_err(|e| CoreError::Internal(format!("CSV write failed: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| CoreError::Internal(format!("CSV flush failed: {e}")))
}
