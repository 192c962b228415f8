//! Content repository interface.
//!
//! The scanner treats the CMS as an external collaborator: pages with HTML
//! bodies and image attachments with stored metadata. This module defines
//! the read-side trait the extractor and orchestrator consume, plus an
//! in-memory implementation used by tests and by embedders that have not
//! wired a real backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// One content item (page or post) with its raw HTML body.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: DbId,
    pub title: String,
    pub url: String,
    /// Content type, e.g. `page` or `post`.
    pub page_type: String,
    pub last_modified: Timestamp,
    pub body_html: String,
    /// Attachment id of the declared featured image, if any.
    pub featured_image_id: Option<DbId>,
}

/// A stored image attachment with file metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub id: DbId,
    pub url: String,
    pub filename: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub byte_size: Option<i64>,
    /// Stored alt text. `None` means no alt metadata exists at all;
    /// `Some("")` means the field exists but is blank.
    pub alt_text: Option<String>,
    pub title: Option<String>,
}

/// Filter criteria for resolving the candidate page list of a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFilter {
    /// Restrict to one content type (`page`, `post`, ...). `None` = all.
    pub page_type: Option<String>,
    /// Only pages modified at or after this instant.
    pub modified_after: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Read access to the content corpus.
///
/// Implementations must apply the URL-matching rules of
/// [`find_attachment_by_url`](ContentRepository::find_attachment_by_url)
/// in priority order: exact URL, URL with a `-{w}x{h}` size-variant suffix
/// stripped, stored filename contained in the URL.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Candidate page ids matching the filter, in stable (id) order.
    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<DbId>, CoreError>;

    /// Fetch one page. `Ok(None)` when the page no longer exists.
    async fn get_page(&self, id: DbId) -> Result<Option<Page>, CoreError>;

    /// Fetch one attachment. `Ok(None)` when `id` is not a valid image
    /// attachment.
    async fn get_attachment(&self, id: DbId) -> Result<Option<Attachment>, CoreError>;

    /// Resolve an image URL to a stored attachment, or `Ok(None)`.
    async fn find_attachment_by_url(&self, url: &str) -> Result<Option<Attachment>, CoreError>;

    /// Site base URL, used for the same-site check on unresolved images.
    fn home_url(&self) -> &str;
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

static SIZE_SUFFIX_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

fn size_suffix_re() -> &'static regex::Regex {
    SIZE_SUFFIX_RE.get_or_init(|| {
        regex::Regex::new(r"-\d+x\d+(\.[A-Za-z0-9]+)$").expect("size-suffix regex")
    })
}

/// Strip a trailing `-{width}x{height}` size-variant suffix from the file
/// stem of a URL, e.g. `.../photo-300x200.jpg` -> `.../photo.jpg`.
///
/// Returns `None` when the URL carries no such suffix.
pub fn strip_size_suffix(url: &str) -> Option<String> {
    let re = size_suffix_re();
    if re.is_match(url) {
        Some(re.replace(url, "$1").into_owned())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// HashMap-backed [`ContentRepository`].
///
/// Built once with `with_page` / `with_attachment`, then read-only.
#[derive(Debug, Clone)]
pub struct InMemoryContentRepository {
    home_url: String,
    pages: HashMap<DbId, Page>,
    attachments: HashMap<DbId, Attachment>,
}

impl InMemoryContentRepository {
    pub fn new(home_url: impl Into<String>) -> Self {
        Self {
            home_url: home_url.into(),
            pages: HashMap::new(),
            attachments: HashMap::new(),
        }
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.insert(page.id, page);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.insert(attachment.id, attachment);
        self
    }

    /// Remove a page after construction. Used to simulate corpus drift
    /// between scan start and batch processing.
    pub fn remove_page(&mut self, id: DbId) {
        self.pages.remove(&id);
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<DbId>, CoreError> {
        let mut ids: Vec<DbId> = self
            .pages
            .values()
            .filter(|p| match &filter.page_type {
                Some(t) => p.page_type == *t,
                None => true,
            })
            .filter(|p| match filter.modified_after {
                Some(after) => p.last_modified >= after,
                None => true,
            })
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn get_page(&self, id: DbId) -> Result<Option<Page>, CoreError> {
        Ok(self.pages.get(&id).cloned())
    }

    async fn get_attachment(&self, id: DbId) -> Result<Option<Attachment>, CoreError> {
        Ok(self.attachments.get(&id).cloned())
    }

    async fn find_attachment_by_url(&self, url: &str) -> Result<Option<Attachment>, CoreError> {
        // Exact canonical URL.
        if let Some(att) = self.attachments.values().find(|a| a.url == url) {
            return Ok(Some(att.clone()));
        }
        // URL with size-variant suffix stripped.
        if let Some(base) = strip_size_suffix(url) {
            if let Some(att) = self.attachments.values().find(|a| a.url == base) {
                return Ok(Some(att.clone()));
            }
        }
        // Stored filename contained in the URL.
        if let Some(att) = self
            .attachments
            .values()
            .find(|a| !a.filename.is_empty() && url.contains(&a.filename))
        {
            return Ok(Some(att.clone()));
        }
        Ok(None)
    }

    fn home_url(&self) -> &str {
        &self.home_url
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
