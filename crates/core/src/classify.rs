//! Accessibility classification of extracted images.
//!
//! Determines alt-text and title-attribute status, captures surrounding
//! text context, and computes the deterministic 0-10 priority score used
//! to rank remediation work. Pure functions over extractor output; no
//! store access.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::content::Page;
use crate::extract::{parse_attr, ImageIdentity, ImageRef, ImageRole};

// ---------------------------------------------------------------------------
// Attribute status
// ---------------------------------------------------------------------------

/// Status of one accessibility attribute on an image.
///
/// `Empty` (attribute exists but trims to zero length) and `Missing`
/// (attribute absent entirely) are distinct: remediation treats a missing
/// attribute on a virtual image as needing manual intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeStatus {
    Present,
    Empty,
    Missing,
}

impl AttributeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Empty => "empty",
            Self::Missing => "missing",
        }
    }

    /// Anything other than `Present` counts as an accessibility issue.
    pub fn is_issue(self) -> bool {
        !matches!(self, Self::Present)
    }

    /// Parse a stored status string back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Self::Present),
            "empty" => Some(Self::Empty),
            "missing" => Some(Self::Missing),
            _ => None,
        }
    }
}

/// Classify an optional attribute value.
///
/// `None` -> `Missing`, whitespace-only -> `Empty`, otherwise `Present`.
pub fn status_of(value: Option<&str>) -> AttributeStatus {
    match value {
        None => AttributeStatus::Missing,
        Some(v) if v.trim().is_empty() => AttributeStatus::Empty,
        Some(_) => AttributeStatus::Present,
    }
}

// ---------------------------------------------------------------------------
// Priority scoring constants
// ---------------------------------------------------------------------------

/// Every image starts here.
pub const PRIORITY_BASE: i64 = 2;
/// Featured images lead the page; fixing them matters most.
pub const PRIORITY_FEATURED_BONUS: i64 = 3;
/// Inline images near the top of the page (position <= 2).
pub const PRIORITY_EARLY_INLINE_BONUS: i64 = 2;
/// Both alt and title are non-present.
pub const PRIORITY_BOTH_MISSING_BONUS: i64 = 2;
/// Alt alone is non-present (alt weighted above title).
pub const PRIORITY_ALT_MISSING_BONUS: i64 = 2;
/// Static pages are assumed higher-traffic than posts.
pub const PRIORITY_PAGE_BONUS: i64 = 1;
/// Inline position threshold for the early-inline bonus.
pub const EARLY_INLINE_POSITION: i64 = 2;
/// Score ceiling.
pub const PRIORITY_MAX: i64 = 10;

/// Compute the additive priority score, clamped to `[0, PRIORITY_MAX]`.
///
/// Deterministic: the same inputs always yield the same score.
pub fn compute_priority(
    role: ImageRole,
    position: i64,
    page_type: &str,
    alt_status: AttributeStatus,
    title_status: AttributeStatus,
) -> i64 {
    let mut score = PRIORITY_BASE;
    if role == ImageRole::Featured {
        score += PRIORITY_FEATURED_BONUS;
    }
    if role == ImageRole::Inline && position <= EARLY_INLINE_POSITION {
        score += PRIORITY_EARLY_INLINE_BONUS;
    }
    if alt_status.is_issue() && title_status.is_issue() {
        score += PRIORITY_BOTH_MISSING_BONUS;
    }
    if alt_status.is_issue() {
        score += PRIORITY_ALT_MISSING_BONUS;
    }
    if page_type == "page" {
        score += PRIORITY_PAGE_BONUS;
    }
    score.clamp(0, PRIORITY_MAX)
}

/// Human-readable severity band for a priority score.
///
/// Bands: critical >= 8, high 6-7, medium 4-5, low < 4.
pub fn priority_label(score: i64) -> &'static str {
    match score {
        s if s >= 8 => "critical",
        6..=7 => "high",
        4..=5 => "medium",
        _ => "low",
    }
}

// ---------------------------------------------------------------------------
// Context extraction
// ---------------------------------------------------------------------------

/// Plain-text window captured on each side of an image tag.
pub const CONTEXT_WINDOW_CHARS: usize = 80;
/// How far past the tag to look for a caption.
const CAPTION_SCAN_CHARS: usize = 400;

static STRIP_TAGS_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static FIGCAPTION_RE: OnceLock<Regex> = OnceLock::new();
static CAPTION_SHORTCODE_RE: OnceLock<Regex> = OnceLock::new();

fn strip_tags_re() -> &'static Regex {
    STRIP_TAGS_RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>|\[[^\]]*\]").expect("strip regex"))
}

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| {
        Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]\s*>").expect("heading regex")
    })
}

fn figcaption_re() -> &'static Regex {
    FIGCAPTION_RE.get_or_init(|| {
        Regex::new(r"(?is)<figcaption[^>]*>(.*?)</figcaption\s*>").expect("figcaption regex")
    })
}

fn caption_shortcode_re() -> &'static Regex {
    CAPTION_SHORTCODE_RE.get_or_init(|| {
        Regex::new(r"(?s)(.*?)\[/caption\]").expect("caption shortcode regex")
    })
}

/// Collapse a fragment of HTML to normalized plain text.
fn strip_tags(html: &str) -> String {
    let text = strip_tags_re().replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last `max_chars` characters of a string.
fn tail_chars(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

/// First `max_chars` characters of a string.
fn head_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Clamp a byte offset down to the nearest char boundary, then slice.
fn slice_from(s: &str, mut start: usize) -> &str {
    if start >= s.len() {
        return "";
    }
    while !s.is_char_boundary(start) {
        start -= 1;
    }
    &s[start..]
}

/// Text of the nearest heading preceding `offset`, tag-stripped.
fn nearest_heading(body: &str, offset: usize) -> Option<String> {
    let before = &body[..offset.min(body.len())];
    heading_re()
        .captures_iter(before)
        .last()
        .map(|caps| strip_tags(&caps[1]))
        .filter(|t| !t.is_empty())
}

/// Caption text attached to the image, when present shortly after the tag:
/// a `<figcaption>` element or a `[caption]...[/caption]` shortcode tail.
fn caption_after(body: &str, tag_end: usize) -> Option<String> {
    let after = head_chars(slice_from(body, tag_end), CAPTION_SCAN_CHARS);
    if let Some(caps) = figcaption_re().captures(&after) {
        let text = strip_tags(&caps[1]);
        if !text.is_empty() {
            return Some(text);
        }
    }
    if let Some(caps) = caption_shortcode_re().captures(&after) {
        let text = strip_tags(&caps[1]);
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classification output for one image observation.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub alt_status: AttributeStatus,
    pub title_status: AttributeStatus,
    /// Current alt text, when any exists.
    pub alt_text: Option<String>,
    /// Current title attribute value, when any exists.
    pub title_text: Option<String>,
    pub context_before: String,
    pub context_after: String,
    pub heading: Option<String>,
    pub caption: Option<String>,
    /// Deterministic remediation priority in `[0, 10]`.
    pub priority: i64,
}

/// Classify one extracted image against its page.
///
/// Alt status comes from stored attachment metadata for resolved images
/// and from the raw tag text for virtual ones. The title attribute only
/// ever lives on the inline tag, so featured images always classify title
/// as `Missing`.
pub fn classify(image: &ImageRef, page: &Page) -> Classification {
    let tag_alt = parse_attr(&image.raw_tag, "alt");
    let tag_title = parse_attr(&image.raw_tag, "title");

    let alt_text = match &image.identity {
        ImageIdentity::Resolved { attachment } if image.role == ImageRole::Featured => {
            attachment.alt_text.clone()
        }
        ImageIdentity::Resolved { attachment } => {
            // Inline resolved images fall back to the tag's own alt when
            // no alt metadata is stored.
            attachment.alt_text.clone().or(tag_alt)
        }
        ImageIdentity::Virtual { .. } => tag_alt,
    };
    let alt_status = status_of(alt_text.as_deref());
    let title_status = status_of(tag_title.as_deref());

    let body = &page.body_html;
    let (context_before, context_after, heading, caption) = if image.raw_tag.is_empty() {
        // Featured images do not appear in the body; only a leading
        // context window applies.
        (
            String::new(),
            head_chars(&strip_tags(body), CONTEXT_WINDOW_CHARS),
            None,
            None,
        )
    } else {
        let offset = image.tag_offset.min(body.len());
        let tag_end = (offset + image.raw_tag.len()).min(body.len());
        (
            tail_chars(&strip_tags(&body[..offset]), CONTEXT_WINDOW_CHARS),
            head_chars(&strip_tags(slice_from(body, tag_end)), CONTEXT_WINDOW_CHARS),
            nearest_heading(body, offset),
            caption_after(body, tag_end),
        )
    };

    let priority = compute_priority(
        image.role,
        image.position,
        &page.page_type,
        alt_status,
        title_status,
    );

    Classification {
        alt_status,
        title_status,
        alt_text: alt_text.filter(|s| !s.trim().is_empty()),
        title_text: tag_title.filter(|s| !s.trim().is_empty()),
        context_before,
        context_after,
        heading,
        caption,
        priority,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
