//! Repository for the `scan_results` table.

use chrono::Utc;
use sqlx::QueryBuilder;

use crate::models::scan_result::{
    CreateScanResult, ResultFilter, ResultPage, ScanResult, ScanStats,
};
use crate::repositories::{clamp_page, clamp_page_size};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, page_id, page_title, page_url, page_type, \
    page_modified_at, image_id, is_virtual, image_url, image_filename, width, height, \
    byte_size, alt_status, title_status, alt_text, title_text, position, role, \
    context_before, context_after, heading, caption, priority, created_at";

/// Provides append, filtered listing, and aggregate statistics for scan
/// results.
pub struct ScanResultRepo;

impl ScanResultRepo {
    /// Append one result row to a session.
    ///
    /// Fails with a foreign-key violation when the owning session does
    /// not exist; the orchestrator never appends after completion.
    pub async fn append(pool: &DbPool, body: &CreateScanResult) -> Result<ScanResult, sqlx::Error> {
        let query = format!(
            "INSERT INTO scan_results \
                (session_id, page_id, page_title, page_url, page_type, page_modified_at, \
                 image_id, is_virtual, image_url, image_filename, width, height, byte_size, \
                 alt_status, title_status, alt_text, title_text, position, role, \
                 context_before, context_after, heading, caption, priority, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScanResult>(&query)
            .bind(&body.session_id)
            .bind(body.page_id)
            .bind(&body.page_title)
            .bind(&body.page_url)
            .bind(&body.page_type)
            .bind(body.page_modified_at)
            .bind(&body.image_id)
            .bind(body.is_virtual)
            .bind(&body.image_url)
            .bind(&body.image_filename)
            .bind(body.width)
            .bind(body.height)
            .bind(body.byte_size)
            .bind(&body.alt_status)
            .bind(&body.title_status)
            .bind(&body.alt_text)
            .bind(&body.title_text)
            .bind(body.position)
            .bind(&body.role)
            .bind(&body.context_before)
            .bind(&body.context_after)
            .bind(&body.heading)
            .bind(&body.caption)
            .bind(body.priority)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// All rows of one session in insertion order. Used by the CSV export.
    pub async fn list_for_session(
        pool: &DbPool,
        session_id: &str,
    ) -> Result<Vec<ScanResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scan_results WHERE session_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ScanResult>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Filtered, paginated listing ordered by priority descending then
    /// recency descending.
    pub async fn list(
        pool: &DbPool,
        session_id: &str,
        filter: &ResultFilter,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<ResultPage, sqlx::Error> {
        let page = clamp_page(page);
        let page_size = clamp_page_size(page_size);

        let mut count_query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM scan_results");
        push_filter_clauses(&mut count_query, session_id, filter);
        let total_count: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM scan_results"));
        push_filter_clauses(&mut query, session_id, filter);
        query.push(" ORDER BY priority DESC, id DESC LIMIT ");
        query.push_bind(page_size);
        query.push(" OFFSET ");
        query.push_bind((page - 1) * page_size);
        let rows = query.build_query_as::<ScanResult>().fetch_all(pool).await?;

        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + page_size - 1) / page_size
        };

        Ok(ResultPage {
            rows,
            total_count,
            total_pages,
            page,
            page_size,
        })
    }

    /// Aggregate statistics for one session.
    pub async fn stats(pool: &DbPool, session_id: &str) -> Result<ScanStats, sqlx::Error> {
        sqlx::query_as::<_, ScanStats>(
            "SELECT
                COUNT(*) AS total_images,
                COALESCE(SUM(CASE WHEN alt_status = 'missing' THEN 1 ELSE 0 END), 0) AS missing_alt,
                COALESCE(SUM(CASE WHEN alt_status = 'empty' THEN 1 ELSE 0 END), 0) AS empty_alt,
                COALESCE(SUM(CASE WHEN title_status = 'missing' THEN 1 ELSE 0 END), 0) AS missing_title,
                COALESCE(SUM(CASE WHEN title_status = 'empty' THEN 1 ELSE 0 END), 0) AS empty_title,
                COALESCE(SUM(CASE WHEN alt_status != 'present' AND title_status != 'present' \
                    THEN 1 ELSE 0 END), 0) AS missing_both,
                COALESCE(SUM(CASE WHEN priority >= 8 THEN 1 ELSE 0 END), 0) AS critical,
                COALESCE(SUM(CASE WHEN priority BETWEEN 6 AND 7 THEN 1 ELSE 0 END), 0) AS high,
                COALESCE(SUM(CASE WHEN priority BETWEEN 4 AND 5 THEN 1 ELSE 0 END), 0) AS medium,
                COALESCE(SUM(CASE WHEN priority < 4 THEN 1 ELSE 0 END), 0) AS low,
                COUNT(DISTINCT CASE WHEN alt_status != 'present' OR title_status != 'present' \
                    THEN page_id END) AS pages_with_issues
             FROM scan_results
             WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(pool)
        .await
    }

    /// Number of issue rows (alt or title non-present) for one session.
    pub async fn count_issues(pool: &DbPool, session_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM scan_results
             WHERE session_id = $1
               AND (alt_status != 'present' OR title_status != 'present')",
        )
        .bind(session_id)
        .fetch_one(pool)
        .await
    }
}

/// Append `WHERE ...` clauses for session scoping plus the optional
/// filters. Shared between the count and select queries so both always
/// agree.
fn push_filter_clauses(
    query: &mut QueryBuilder<'_, sqlx::Sqlite>,
    session_id: &str,
    filter: &ResultFilter,
) {
    query.push(" WHERE session_id = ");
    query.push_bind(session_id.to_string());

    if let Some(alt_status) = &filter.alt_status {
        query.push(" AND alt_status = ");
        query.push_bind(alt_status.clone());
    }
    if let Some(title_status) = &filter.title_status {
        query.push(" AND title_status = ");
        query.push_bind(title_status.clone());
    }
    if let Some(min_priority) = filter.min_priority {
        query.push(" AND priority >= ");
        query.push_bind(min_priority);
    }
    if let Some(page_type) = &filter.page_type {
        query.push(" AND page_type = ");
        query.push_bind(page_type.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query.push(" AND (page_title LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR heading LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR context_before LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR context_after LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}
