//! The scan session state machine.
//!
//! `start` resolves the candidate page list once and creates a running
//! session; `process_batch` crawls one bounded slice of that fixed list;
//! completion is marked when the requested range reaches the end of the
//! list. Each batch call is synchronous and bounded by `batch_size`, so a
//! polling caller can progress a scan of any size without timing out.
//!
//! Sequential, non-overlapping batch progression is the caller's
//! contract: counter updates are last-write-wins merges, and re-running a
//! range inserts duplicate rows.

use std::sync::Arc;

use serde::Serialize;

use a11yscan_core::classify::classify;
use a11yscan_core::content::{ContentRepository, Page, PageFilter};
use a11yscan_core::error::CoreError;
use a11yscan_core::extract::{extract_images, ImageIdentity, ImageRef};
use a11yscan_db::models::scan_result::CreateScanResult;
use a11yscan_db::models::scan_session::{CreateScanSession, ScanSession, UpdateScanProgress, VALID_MODES};
use a11yscan_db::repositories::{ScanResultRepo, ScanSessionRepo};
use a11yscan_db::DbPool;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("No pages matched the scan filters")]
    EmptyCorpus,

    #[error("Invalid scan mode '{0}'")]
    InvalidMode(String),

    #[error("Invalid batch range: {0}")]
    InvalidBatch(String),

    #[error("Scan session not found: {0}")]
    SessionNotFound(String),

    #[error("Scan session {id} is {status}, not running")]
    SessionNotRunning { id: String, status: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Corrupt session state: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Returned by [`ScanOrchestrator::start`].
#[derive(Debug, Serialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub pages_total: i64,
}

/// Returned by each [`ScanOrchestrator::process_batch`] call so the
/// caller knows when to stop polling.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub pages_scanned: i64,
    pub pages_total: i64,
    pub pages_skipped: i64,
    pub images_found: i64,
    pub issues_found: i64,
    /// Issue rows appended by this batch alone.
    pub issues_found_delta: i64,
    pub is_complete: bool,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives scan sessions against a content repository and the scan store.
///
/// Holds no scan state of its own; everything lives in the session and
/// result rows, so any number of orchestrator instances can serve the
/// same store.
#[derive(Clone)]
pub struct ScanOrchestrator {
    pool: DbPool,
    content: Arc<dyn ContentRepository>,
}

impl ScanOrchestrator {
    pub fn new(pool: DbPool, content: Arc<dyn ContentRepository>) -> Self {
        Self { pool, content }
    }

    /// Start a new scan session.
    ///
    /// Resolves the candidate page list once, up front; corpus changes
    /// after this point do not adjust `pages_total`. Zero candidates is
    /// an error and creates no session.
    pub async fn start(
        &self,
        mode: &str,
        filter: &PageFilter,
        triggered_by: Option<String>,
    ) -> Result<StartOutcome, ScanError> {
        if !VALID_MODES.contains(&mode) {
            return Err(ScanError::InvalidMode(mode.to_string()));
        }

        let page_ids = self.content.list_pages(filter).await?;
        if page_ids.is_empty() {
            return Err(ScanError::EmptyCorpus);
        }

        let session = ScanSessionRepo::create(
            &self.pool,
            &CreateScanSession {
                scan_mode: mode.to_string(),
                filters_json: serde_json::to_value(filter)?,
                page_ids,
                triggered_by,
            },
        )
        .await?;

        tracing::info!(
            session_id = %session.id,
            mode,
            pages_total = session.pages_total,
            "Scan session started",
        );

        Ok(StartOutcome {
            pages_total: session.pages_total,
            session_id: session.id,
        })
    }

    /// Process one batch of the session's fixed candidate list.
    ///
    /// Safe to call repeatedly; which pages it touches depends only on
    /// `batch_start` / `batch_size`. A page that fails to load is
    /// skipped (and still counted toward `pages_scanned`); a store write
    /// failure fails the whole call and leaves the session `running` so
    /// the same range can be retried.
    pub async fn process_batch(
        &self,
        session_id: &str,
        batch_start: i64,
        batch_size: i64,
    ) -> Result<BatchOutcome, ScanError> {
        if batch_start < 0 || batch_size < 1 {
            return Err(ScanError::InvalidBatch(format!(
                "batch_start {batch_start}, batch_size {batch_size}"
            )));
        }

        let session = self.require_running(session_id).await?;
        let page_ids = session.page_ids()?;

        let start = (batch_start as usize).min(page_ids.len());
        let end = start.saturating_add(batch_size as usize).min(page_ids.len());
        let slice = &page_ids[start..end];

        let mut images_delta: i64 = 0;
        let mut issues_delta: i64 = 0;
        let mut skipped_delta: i64 = 0;

        for &page_id in slice {
            match self.content.get_page(page_id).await {
                Ok(Some(page)) => {
                    let (images, issues) = self.scan_page(&session.id, &page).await?;
                    images_delta += images;
                    issues_delta += issues;
                }
                Ok(None) => {
                    // Deleted between start and this batch; counted but
                    // not scanned.
                    skipped_delta += 1;
                    tracing::warn!(session_id = %session.id, page_id, "Page vanished mid-scan, skipping");
                }
                Err(e) => {
                    skipped_delta += 1;
                    tracing::warn!(session_id = %session.id, page_id, error = %e, "Page fetch failed, skipping");
                }
            }
        }

        let progress = UpdateScanProgress {
            pages_scanned: (session.pages_scanned + slice.len() as i64).min(session.pages_total),
            pages_skipped: session.pages_skipped + skipped_delta,
            images_found: session.images_found + images_delta,
            issues_found: session.issues_found + issues_delta,
        };
        let updated = ScanSessionRepo::update_progress(&self.pool, &session.id, &progress)
            .await?
            .ok_or_else(|| ScanError::SessionNotRunning {
                id: session.id.clone(),
                status: "terminal".to_string(),
            })?;

        let is_complete = batch_start.saturating_add(batch_size) >= updated.pages_total;
        let final_session = if is_complete {
            match ScanSessionRepo::mark_completed(&self.pool, &updated.id).await? {
                Some(completed) => {
                    tracing::info!(
                        session_id = %completed.id,
                        pages_scanned = completed.pages_scanned,
                        images_found = completed.images_found,
                        issues_found = completed.issues_found,
                        "Scan session completed",
                    );
                    completed
                }
                // Cancelled between the progress update and here; the
                // terminal state wins.
                None => updated,
            }
        } else {
            updated
        };

        Ok(BatchOutcome {
            pages_scanned: final_session.pages_scanned,
            pages_total: final_session.pages_total,
            pages_skipped: final_session.pages_skipped,
            images_found: final_session.images_found,
            issues_found: final_session.issues_found,
            issues_found_delta: issues_delta,
            is_complete,
        })
    }

    /// Cancel a running session. Already-appended batches remain; a batch
    /// call in flight completes on its own. Unknown ids are an error;
    /// cancelling an already-terminal session is a no-op.
    pub async fn cancel(&self, session_id: &str) -> Result<ScanSession, ScanError> {
        let session = self.require_session(session_id).await?;
        if session.is_terminal() {
            return Ok(session);
        }
        match ScanSessionRepo::mark_cancelled(&self.pool, session_id).await? {
            Some(cancelled) => {
                tracing::info!(session_id, "Scan session cancelled");
                Ok(cancelled)
            }
            None => self.require_session(session_id).await,
        }
    }

    /// Remove a session and all of its results. Idempotent.
    pub async fn delete(&self, session_id: &str) -> Result<(), ScanError> {
        let deleted = ScanSessionRepo::delete(&self.pool, session_id).await?;
        if deleted > 0 {
            tracing::info!(session_id, "Scan session deleted");
        }
        Ok(())
    }

    // -- Internals -----------------------------------------------------------

    async fn require_session(&self, session_id: &str) -> Result<ScanSession, ScanError> {
        ScanSessionRepo::find_by_id(&self.pool, session_id)
            .await?
            .ok_or_else(|| ScanError::SessionNotFound(session_id.to_string()))
    }

    async fn require_running(&self, session_id: &str) -> Result<ScanSession, ScanError> {
        let session = self.require_session(session_id).await?;
        if session.is_terminal() {
            return Err(ScanError::SessionNotRunning {
                id: session.id,
                status: session.status,
            });
        }
        Ok(session)
    }

    /// Extract, classify, and persist every image on one page. Returns
    /// `(images, issues)` appended. Store errors propagate and fail the
    /// batch; extraction errors skip the page's remaining images only.
    async fn scan_page(&self, session_id: &str, page: &Page) -> Result<(i64, i64), ScanError> {
        let images = match extract_images(page, self.content.as_ref()).await {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(session_id, page_id = page.id, error = %e, "Image extraction failed, skipping page");
                return Ok((0, 0));
            }
        };

        let mut issues: i64 = 0;
        let count = images.len() as i64;
        for image in &images {
            let row = build_result(session_id, page, image);
            if row.alt_status != "present" || row.title_status != "present" {
                issues += 1;
            }
            ScanResultRepo::append(&self.pool, &row).await?;
        }
        Ok((count, issues))
    }
}

/// Flatten one classified image observation into an insertable row.
fn build_result(session_id: &str, page: &Page, image: &ImageRef) -> CreateScanResult {
    let classification = classify(image, page);

    let (image_id, is_virtual, filename, width, height, byte_size) = match &image.identity {
        ImageIdentity::Resolved { attachment } => (
            attachment.id.to_string(),
            false,
            attachment.filename.clone(),
            attachment.width,
            attachment.height,
            attachment.byte_size,
        ),
        ImageIdentity::Virtual { url_hash } => (
            url_hash.clone(),
            true,
            filename_from_url(&image.url),
            None,
            None,
            None,
        ),
    };

    CreateScanResult {
        session_id: session_id.to_string(),
        page_id: page.id,
        page_title: page.title.clone(),
        page_url: page.url.clone(),
        page_type: page.page_type.clone(),
        page_modified_at: page.last_modified,
        image_id,
        is_virtual,
        image_url: image.url.clone(),
        image_filename: filename,
        width,
        height,
        byte_size,
        alt_status: classification.alt_status.as_str().to_string(),
        title_status: classification.title_status.as_str().to_string(),
        alt_text: classification.alt_text,
        title_text: classification.title_text,
        position: image.position,
        role: image.role.as_str().to_string(),
        context_before: classification.context_before,
        context_after: classification.context_after,
        heading: classification.heading,
        caption: classification.caption,
        priority: classification.priority,
    }
}

/// Last path segment of a URL, without query string.
fn filename_from_url(url: &str) -> String {
    url.split('?')
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
