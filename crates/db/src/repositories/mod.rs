//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&DbPool` as the first argument.

pub mod scan_result_repo;
pub mod scan_session_repo;

pub use scan_result_repo::ScanResultRepo;
pub use scan_session_repo::ScanSessionRepo;

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default number of result rows per page.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum number of result rows per page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamp a caller-supplied page size into `[1, MAX_PAGE_SIZE]`.
pub fn clamp_page_size(page_size: Option<i64>) -> i64 {
    page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

/// Clamp a caller-supplied 1-based page number to at least 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}
