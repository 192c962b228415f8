//! Image extraction from page HTML.
//!
//! Walks one page and produces every image observation in document order:
//! the declared featured image first (position 1), then each inline
//! `<img>` tag. Each tag is resolved to a stored attachment when possible;
//! unresolved same-site images become "virtual" references keyed by a
//! SHA-256 hash of their URL, so re-scans map the same unresolved image to
//! the same id. External-site images are skipped entirely.
//!
//! Only single self-contained `<img ...>` tags are inspected, so regex
//! matching is sufficient; no DOM parse is needed.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::content::{Attachment, ContentRepository, Page};
use crate::error::CoreError;
use crate::hashing::sha256_hex;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Tag regexes
// ---------------------------------------------------------------------------

static IMG_TAG_RE: OnceLock<Regex> = OnceLock::new();
static WP_IMAGE_CLASS_RE: OnceLock<Regex> = OnceLock::new();
static ATTR_RE: OnceLock<Regex> = OnceLock::new();

fn img_tag_re() -> &'static Regex {
    IMG_TAG_RE.get_or_init(|| Regex::new(r"(?i)<img\b[^>]*>").expect("img tag regex"))
}

fn wp_image_class_re() -> &'static Regex {
    WP_IMAGE_CLASS_RE.get_or_init(|| Regex::new(r"wp-image-(\d+)").expect("wp-image regex"))
}

fn attr_re() -> &'static Regex {
    ATTR_RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("attribute regex")
    })
}

/// Extract a named attribute value from a single tag's text.
///
/// Returns `None` when the attribute is absent, `Some("")` when it is
/// present but empty. Attribute names are matched case-insensitively.
pub fn parse_attr(tag: &str, name: &str) -> Option<String> {
    for caps in attr_re().captures_iter(tag) {
        if caps[1].eq_ignore_ascii_case(name) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            return Some(value.to_string());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Image reference types
// ---------------------------------------------------------------------------

/// Structural role of an image on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    Featured,
    Gallery,
    Inline,
    Other,
}

impl ImageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Gallery => "gallery",
            Self::Inline => "inline",
            Self::Other => "other",
        }
    }
}

/// Identity of an extracted image: either a stored attachment or a
/// virtual reference keyed by URL hash.
#[derive(Debug, Clone)]
pub enum ImageIdentity {
    Resolved { attachment: Attachment },
    Virtual { url_hash: String },
}

impl ImageIdentity {
    /// Stable identifier string: numeric attachment id, or the URL hash.
    pub fn id_string(&self) -> String {
        match self {
            Self::Resolved { attachment } => attachment.id.to_string(),
            Self::Virtual { url_hash } => url_hash.clone(),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual { .. })
    }
}

/// One image observation on a page, in document order.
#[derive(Debug, Clone)]
pub struct ImageRef {
    /// 1-based order of appearance; the featured image is always 1.
    pub position: i64,
    pub role: ImageRole,
    /// Byte offset of the tag within the page body. 0 for the featured
    /// image, which does not appear in the body.
    pub tag_offset: usize,
    /// Raw `<img ...>` tag text; empty for the featured image. Carries
    /// enough for the classifier to re-derive alt/title without
    /// re-fetching the page.
    pub raw_tag: String,
    pub url: String,
    pub identity: ImageIdentity,
}

// ---------------------------------------------------------------------------
// Same-site check
// ---------------------------------------------------------------------------

/// Path marker identifying the site's own media directory.
pub const UPLOADS_PATH_MARKER: &str = "/wp-content/";

/// Whether an image URL belongs to the scanned site.
///
/// Root-relative URLs are always same-site; absolute URLs must carry the
/// home-URL prefix or the uploads-directory path marker.
pub fn is_same_site(url: &str, home_url: &str) -> bool {
    if url.starts_with('/') && !url.starts_with("//") {
        return true;
    }
    url.starts_with(home_url) || url.contains(UPLOADS_PATH_MARKER)
}

/// Derive the stable virtual id for an unresolved image URL.
pub fn virtual_image_id(url: &str) -> String {
    sha256_hex(url.as_bytes())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract every image observation from a page, in document order.
///
/// The featured image (when resolvable) is emitted first at position 1;
/// inline tags follow with strictly increasing positions. Tags that are
/// external, empty, or placeholder (`#`) src produce no entry.
pub async fn extract_images(
    page: &Page,
    repo: &dyn ContentRepository,
) -> Result<Vec<ImageRef>, CoreError> {
    let mut images = Vec::new();
    let mut position: i64 = 1;

    if let Some(featured_id) = page.featured_image_id {
        if let Some(attachment) = repo.get_attachment(featured_id).await? {
            images.push(ImageRef {
                position,
                role: ImageRole::Featured,
                tag_offset: 0,
                raw_tag: String::new(),
                url: attachment.url.clone(),
                identity: ImageIdentity::Resolved { attachment },
            });
            position += 1;
        }
    }

    for tag_match in img_tag_re().find_iter(&page.body_html) {
        let tag = tag_match.as_str();
        let Some((url, identity)) = resolve_tag(tag, repo).await? else {
            continue;
        };
        images.push(ImageRef {
            position,
            role: ImageRole::Inline,
            tag_offset: tag_match.start(),
            raw_tag: tag.to_string(),
            url,
            identity,
        });
        position += 1;
    }

    Ok(images)
}

/// Resolve one inline `<img>` tag to an identity, or `None` to skip it.
///
/// Resolution order: `wp-image-{N}` class marker (confirmed against the
/// repository), src URL lookup, same-site virtual fallback.
async fn resolve_tag(
    tag: &str,
    repo: &dyn ContentRepository,
) -> Result<Option<(String, ImageIdentity)>, CoreError> {
    let src = parse_attr(tag, "src").unwrap_or_default();

    // Strategy 1: wp-image-{N} class marker.
    if let Some(class) = parse_attr(tag, "class") {
        if let Some(caps) = wp_image_class_re().captures(&class) {
            if let Ok(id) = caps[1].parse::<DbId>() {
                if let Some(attachment) = repo.get_attachment(id).await? {
                    let url = if src.is_empty() {
                        attachment.url.clone()
                    } else {
                        src
                    };
                    return Ok(Some((url, ImageIdentity::Resolved { attachment })));
                }
            }
        }
    }

    if src.is_empty() || src.starts_with('#') {
        return Ok(None);
    }

    // Strategy 2: URL lookup.
    if let Some(attachment) = repo.find_attachment_by_url(&src).await? {
        return Ok(Some((src, ImageIdentity::Resolved { attachment })));
    }

    // Strategy 3: same-site virtual fallback. External images are skipped;
    // the scanner has no authority to remediate them.
    if is_same_site(&src, repo.home_url()) {
        let url_hash = virtual_image_id(&src);
        return Ok(Some((src, ImageIdentity::Virtual { url_hash })));
    }

    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
