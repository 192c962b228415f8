//! End-to-end orchestrator tests: in-memory content corpus, real store.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Utc;
use sqlx::SqlitePool;

use a11yscan_core::content::{Attachment, InMemoryContentRepository, Page, PageFilter};
use a11yscan_db::models::scan_result::ResultFilter;
use a11yscan_db::models::scan_session::{STATUS_CANCELLED, STATUS_COMPLETED, STATUS_RUNNING};
use a11yscan_db::repositories::{ScanResultRepo, ScanSessionRepo};
use a11yscan_scanner::{ScanError, ScanOrchestrator};

const HOME: &str = "https://example.com";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn page(id: i64, page_type: &str, body: &str) -> Page {
    Page {
        id,
        title: format!("Page {id}"),
        url: format!("{HOME}/p/{id}"),
        page_type: page_type.to_string(),
        last_modified: Utc::now(),
        body_html: body.to_string(),
        featured_image_id: None,
    }
}

fn attachment(id: i64, url: &str, alt_text: Option<&str>) -> Attachment {
    Attachment {
        id,
        url: url.to_string(),
        filename: url.rsplit('/').next().unwrap_or_default().to_string(),
        width: Some(1200),
        height: Some(800),
        byte_size: Some(250_000),
        alt_text: alt_text.map(str::to_string),
        title: None,
    }
}

fn orchestrator(pool: &SqlitePool, repo: InMemoryContentRepository) -> ScanOrchestrator {
    ScanOrchestrator::new(pool.clone(), Arc::new(repo))
}

// ---------------------------------------------------------------------------
// Scenario A: inline image with empty alt, no title
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn inline_image_with_empty_alt_is_high_priority(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME)
        .with_attachment(attachment(5, "https://example.com/up/photo.jpg", Some("")))
        .with_page(page(
            1,
            "post",
            r#"<p>intro</p><img class="wp-image-5" src="https://example.com/up/photo.jpg">"#,
        ));
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    assert_eq!(started.pages_total, 1);

    let outcome = orch.process_batch(&started.session_id, 0, 10).await.unwrap();
    assert!(outcome.is_complete);
    assert_eq!(outcome.images_found, 1);
    assert_eq!(outcome.issues_found, 1);

    let rows = ScanResultRepo::list_for_session(&pool, &started.session_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.alt_status, "empty");
    assert_eq!(row.title_status, "missing");
    assert_eq!(row.image_id, "5");
    assert!(!row.is_virtual);
    // base 2 + early inline 2 + both 2 + alt 2
    assert_eq!(row.priority, 8);
}

// ---------------------------------------------------------------------------
// Scenario B: featured image with good alt
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn featured_image_with_alt_present(pool: SqlitePool) {
    let mut featured_page = page(1, "post", "<p>no inline images here</p>");
    featured_page.featured_image_id = Some(9);
    let repo = InMemoryContentRepository::new(HOME)
        .with_attachment(attachment(
            9,
            "https://example.com/up/sunset.jpg",
            Some("Sunset over hills"),
        ))
        .with_page(featured_page);
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    orch.process_batch(&started.session_id, 0, 10).await.unwrap();

    let rows = ScanResultRepo::list_for_session(&pool, &started.session_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.position, 1);
    assert_eq!(row.role, "featured");
    assert_eq!(row.alt_status, "present");
    assert_eq!(row.alt_text.as_deref(), Some("Sunset over hills"));
    // Featured images never carry a title attribute.
    assert_eq!(row.title_status, "missing");
    // base 2 + featured 3, no alt bonus.
    assert_eq!(row.priority, 5);
}

// ---------------------------------------------------------------------------
// Scenario C: external image produces no row
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn external_image_is_not_scanned(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME).with_page(page(
        1,
        "post",
        r#"<img src="https://elsewhere.com/elsewhere.jpg">"#,
    ));
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    let outcome = orch.process_batch(&started.session_id, 0, 10).await.unwrap();

    assert!(outcome.is_complete);
    assert_eq!(outcome.images_found, 0);
    let rows = ScanResultRepo::list_for_session(&pool, &started.session_id)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

// ---------------------------------------------------------------------------
// Scenario D: empty corpus
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_corpus_creates_no_session(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME).with_page(page(1, "post", ""));
    let orch = orchestrator(&pool, repo);

    let filter = PageFilter {
        page_type: Some("page".to_string()),
        modified_after: None,
    };
    let err = orch.start("by-type", &filter, None).await;
    assert_matches!(err, Err(ScanError::EmptyCorpus));

    let sessions = ScanSessionRepo::list_all(&pool, 10, 0).await.unwrap();
    assert!(sessions.is_empty(), "failed start must not create a session");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_mode_is_rejected(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME).with_page(page(1, "post", ""));
    let orch = orchestrator(&pool, repo);

    let err = orch.start("everything", &PageFilter::default(), None).await;
    assert_matches!(err, Err(ScanError::InvalidMode(_)));
}

// ---------------------------------------------------------------------------
// P5: monotonic counters, terminal states stay terminal
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn pages_scanned_never_exceeds_total(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME)
        .with_page(page(1, "post", ""))
        .with_page(page(2, "post", ""));
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    // Oversized batch covering the whole list.
    let outcome = orch.process_batch(&started.session_id, 0, 50).await.unwrap();
    assert_eq!(outcome.pages_scanned, 2);
    assert_eq!(outcome.pages_total, 2);
    assert!(outcome.is_complete);

    // Completed session rejects further batches.
    let err = orch.process_batch(&started.session_id, 0, 50).await;
    assert_matches!(err, Err(ScanError::SessionNotRunning { .. }));

    let session = ScanSessionRepo::find_by_id(&pool, &started.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, STATUS_COMPLETED);
    assert!(session.pages_scanned <= session.pages_total);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn batch_range_near_i64_max_does_not_overflow(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME)
        .with_page(page(1, "post", ""))
        .with_page(page(2, "post", ""));
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();

    // A start past the end of the list scans nothing but still completes.
    let outcome = orch
        .process_batch(&started.session_id, i64::MAX - 1, i64::MAX)
        .await
        .unwrap();
    assert_eq!(outcome.pages_scanned, 0);
    assert!(outcome.is_complete);

    let session = ScanSessionRepo::find_by_id(&pool, &started.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, STATUS_COMPLETED);
}

// ---------------------------------------------------------------------------
// P6: resumable batches equal one big batch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn split_batches_yield_same_rows_as_one_batch(pool: SqlitePool) {
    let mut repo = InMemoryContentRepository::new(HOME);
    for id in 1..=4 {
        repo = repo.with_page(page(
            id,
            "post",
            &format!(r#"<img src="https://example.com/wp-content/uploads/{id}.jpg">"#),
        ));
    }
    let orch = orchestrator(&pool, repo);

    let split = orch.start("full", &PageFilter::default(), None).await.unwrap();
    let first = orch.process_batch(&split.session_id, 0, 2).await.unwrap();
    assert!(!first.is_complete);
    assert_eq!(first.pages_scanned, 2);
    let second = orch.process_batch(&split.session_id, 2, 2).await.unwrap();
    assert!(second.is_complete);

    let whole = orch.start("full", &PageFilter::default(), None).await.unwrap();
    let outcome = orch.process_batch(&whole.session_id, 0, 4).await.unwrap();
    assert!(outcome.is_complete);

    let mut split_rows: Vec<(i64, String, i64)> =
        ScanResultRepo::list_for_session(&pool, &split.session_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.page_id, r.image_id, r.position))
            .collect();
    let mut whole_rows: Vec<(i64, String, i64)> =
        ScanResultRepo::list_for_session(&pool, &whole.session_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.page_id, r.image_id, r.position))
            .collect();
    split_rows.sort();
    whole_rows.sort();
    assert_eq!(split_rows, whole_rows);
    assert_eq!(split_rows.len(), 4);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn cancel_stops_future_batches_but_keeps_rows(pool: SqlitePool) {
    let mut repo = InMemoryContentRepository::new(HOME);
    for id in 1..=4 {
        repo = repo.with_page(page(
            id,
            "post",
            &format!(r#"<img src="https://example.com/wp-content/uploads/{id}.jpg">"#),
        ));
    }
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    orch.process_batch(&started.session_id, 0, 2).await.unwrap();

    let cancelled = orch.cancel(&started.session_id).await.unwrap();
    assert_eq!(cancelled.status, STATUS_CANCELLED);
    assert!(cancelled.completed_at.is_some());

    let err = orch.process_batch(&started.session_id, 2, 2).await;
    assert_matches!(err, Err(ScanError::SessionNotRunning { .. }));

    let rows = ScanResultRepo::list_for_session(&pool, &started.session_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2, "already-appended batches remain");

    // Cancelling again is a no-op, not an error.
    let again = orch.cancel(&started.session_id).await.unwrap();
    assert_eq!(again.status, STATUS_CANCELLED);

    // Unknown ids are an error.
    let unknown = orch.cancel("no-such-session").await;
    assert_matches!(unknown, Err(ScanError::SessionNotFound(_)));
}

// ---------------------------------------------------------------------------
// Corpus drift
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn vanished_page_is_skipped_but_counted(pool: SqlitePool) {
    let full_repo = InMemoryContentRepository::new(HOME)
        .with_page(page(1, "post", ""))
        .with_page(page(2, "post", ""));
    // The candidate list is resolved against the full corpus...
    let started = orchestrator(&pool, full_repo.clone())
        .start("full", &PageFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(started.pages_total, 2);

    // ...but page 2 is gone by the time the batch runs.
    let mut drifted = full_repo;
    drifted.remove_page(2);
    let outcome = orchestrator(&pool, drifted)
        .process_batch(&started.session_id, 0, 2)
        .await
        .unwrap();

    assert!(outcome.is_complete);
    assert_eq!(outcome.pages_scanned, 2, "vanished page still counts");
    assert_eq!(outcome.pages_skipped, 1);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_removes_session_and_results(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME).with_page(page(
        1,
        "post",
        r#"<img src="https://example.com/wp-content/uploads/a.jpg">"#,
    ));
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    orch.process_batch(&started.session_id, 0, 10).await.unwrap();

    orch.delete(&started.session_id).await.unwrap();
    assert!(ScanSessionRepo::find_by_id(&pool, &started.session_id)
        .await
        .unwrap()
        .is_none());
    // Deleting again is fine.
    orch.delete(&started.session_id).await.unwrap();
}

// ---------------------------------------------------------------------------
// Virtual images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn virtual_images_get_stable_hash_ids_across_sessions(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME).with_page(page(
        1,
        "post",
        r#"<img src="https://example.com/wp-content/uploads/unknown.jpg">"#,
    ));
    let orch = orchestrator(&pool, repo);

    let first = orch.start("full", &PageFilter::default(), None).await.unwrap();
    orch.process_batch(&first.session_id, 0, 10).await.unwrap();
    let second = orch.start("full", &PageFilter::default(), None).await.unwrap();
    orch.process_batch(&second.session_id, 0, 10).await.unwrap();

    let a = &ScanResultRepo::list_for_session(&pool, &first.session_id)
        .await
        .unwrap()[0];
    let b = &ScanResultRepo::list_for_session(&pool, &second.session_id)
        .await
        .unwrap()[0];
    assert!(a.is_virtual);
    assert_eq!(a.image_id, b.image_id, "same URL, same virtual id");
    assert_eq!(a.image_id.len(), 64);
    // No cross-session dedup: both sessions own their rows.
    assert_ne!(a.session_id, b.session_id);
}

// ---------------------------------------------------------------------------
// Result querying through the store after a scan
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn running_session_status_visible_midway(pool: SqlitePool) {
    let repo = InMemoryContentRepository::new(HOME)
        .with_page(page(1, "post", ""))
        .with_page(page(2, "post", ""))
        .with_page(page(3, "post", ""));
    let orch = orchestrator(&pool, repo);

    let started = orch.start("full", &PageFilter::default(), None).await.unwrap();
    let outcome = orch.process_batch(&started.session_id, 0, 1).await.unwrap();
    assert!(!outcome.is_complete);

    let session = ScanSessionRepo::find_by_id(&pool, &started.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, STATUS_RUNNING);
    assert_eq!(session.pages_scanned, 1);

    let results = ScanResultRepo::list(&pool, &started.session_id, &ResultFilter::default(), None, None)
        .await
        .unwrap();
    assert_eq!(results.total_count, 0, "empty bodies produce no rows");
}
