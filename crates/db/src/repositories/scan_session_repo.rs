//! Repository for the `scan_sessions` table.

use chrono::Utc;

use crate::models::scan_session::{
    CreateScanSession, ScanSession, UpdateScanProgress, STATUS_CANCELLED, STATUS_COMPLETED,
    STATUS_FAILED, STATUS_RUNNING,
};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, scan_mode, status, pages_total, pages_scanned, pages_skipped, \
    images_found, issues_found, filters_json, page_ids_json, triggered_by, error_message, \
    started_at, completed_at";

/// Provides CRUD operations for scan sessions.
pub struct ScanSessionRepo;

impl ScanSessionRepo {
    /// Insert a new running session with zero counters, returning the
    /// created row. `pages_total` is fixed from the candidate list here
    /// and never re-evaluated.
    pub async fn create(pool: &DbPool, body: &CreateScanSession) -> Result<ScanSession, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let page_ids_json =
            serde_json::to_string(&body.page_ids).unwrap_or_else(|_| "[]".to_string());
        let query = format!(
            "INSERT INTO scan_sessions \
                (id, scan_mode, status, pages_total, filters_json, page_ids_json, \
                 triggered_by, started_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScanSession>(&query)
            .bind(&id)
            .bind(&body.scan_mode)
            .bind(STATUS_RUNNING)
            .bind(body.page_ids.len() as i64)
            .bind(body.filters_json.to_string())
            .bind(&page_ids_json)
            .bind(&body.triggered_by)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Find a single session by id.
    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<ScanSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scan_sessions WHERE id = $1");
        sqlx::query_as::<_, ScanSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all sessions, newest first.
    pub async fn list_all(
        pool: &DbPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScanSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scan_sessions
             ORDER BY started_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, ScanSession>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Merge counter updates into a running session.
    ///
    /// Guarded by `status = 'running'`: a terminal session is never
    /// resurrected. Returns `None` when the session is missing or no
    /// longer running.
    pub async fn update_progress(
        pool: &DbPool,
        id: &str,
        body: &UpdateScanProgress,
    ) -> Result<Option<ScanSession>, sqlx::Error> {
        let query = format!(
            "UPDATE scan_sessions
             SET pages_scanned = $2,
                 pages_skipped = $3,
                 images_found = $4,
                 issues_found = $5
             WHERE id = $1 AND status = '{STATUS_RUNNING}'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScanSession>(&query)
            .bind(id)
            .bind(body.pages_scanned)
            .bind(body.pages_skipped)
            .bind(body.images_found)
            .bind(body.issues_found)
            .fetch_optional(pool)
            .await
    }

    /// Transition `running` -> `completed`, stamping `completed_at`.
    /// Returns `None` when the session is missing or already terminal.
    pub async fn mark_completed(
        pool: &DbPool,
        id: &str,
    ) -> Result<Option<ScanSession>, sqlx::Error> {
        Self::transition(pool, id, STATUS_COMPLETED, None).await
    }

    /// Transition `running` -> `cancelled`. Appended results remain.
    pub async fn mark_cancelled(
        pool: &DbPool,
        id: &str,
    ) -> Result<Option<ScanSession>, sqlx::Error> {
        Self::transition(pool, id, STATUS_CANCELLED, None).await
    }

    /// Transition `running` -> `failed` with a reason.
    pub async fn mark_failed(
        pool: &DbPool,
        id: &str,
        error_message: &str,
    ) -> Result<Option<ScanSession>, sqlx::Error> {
        Self::transition(pool, id, STATUS_FAILED, Some(error_message)).await
    }

    async fn transition(
        pool: &DbPool,
        id: &str,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<Option<ScanSession>, sqlx::Error> {
        let query = format!(
            "UPDATE scan_sessions
             SET status = $2, completed_at = $3, error_message = COALESCE($4, error_message)
             WHERE id = $1 AND status = '{STATUS_RUNNING}'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScanSession>(&query)
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }

    /// Delete a session and (via cascade) all of its results. Idempotent:
    /// deleting a non-existent session affects zero rows and is not an
    /// error.
    pub async fn delete(pool: &DbPool, id: &str) -> Result<u64, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM scan_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(deleted.rows_affected())
    }
}
