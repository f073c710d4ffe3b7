//! Posts, images and comments as handed over by the feed collaborator.
//!
//! Values are immutable once constructed. Text is cleaned on the way in so
//! that every downstream stage (metrics, layout) sees the same string.

use chrono::{DateTime, FixedOffset, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ── Text cleanup ─────────────────────────────────────────────────────────

static RE_LINK_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<https?://[^>]*>\n?").unwrap());
static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

const INVISIBLE: [char; 6] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

/// Normalise plain text extracted from a post or comment body.
///
/// 1. CRLF / CR → LF
/// 2. Drop inline `<http…>` link markers left behind by HTML-to-text
/// 3. Strip zero-width characters and soft hyphens
/// 4. Trim trailing whitespace per line and collapse 3+ newlines to 2
pub fn clean_text(input: &str) -> String {
    let s = input.replace("\r\n", "\n").replace('\r', "\n");
    let s = RE_LINK_MARKER.replace_all(&s, "");
    let s: String = s.chars().filter(|c| !INVISIBLE.contains(c)).collect();
    let s = s
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_RUNS.replace_all(s.trim(), "\n\n").into_owned()
}

// ── Images ───────────────────────────────────────────────────────────────

/// A reference to an image as it appears in the post source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// URL or path exactly as sourced.
    pub source: String,
}

impl ImageRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Local file name used when the image is materialised for a post:
    /// `{post_id}-{last path segment}`.
    pub fn file_name(&self, post_id: &str) -> String {
        let trimmed = self.source.split(['?', '#']).next().unwrap_or("");
        let last = trimmed.rsplit('/').next().unwrap_or("");
        let last = if last.is_empty() { "image" } else { last };
        format!("{post_id}-{last}")
    }
}

// ── Comments ─────────────────────────────────────────────────────────────

/// A reader comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    author: String,
    text: String,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl AsRef<str>) -> Self {
        Self {
            author: author.into(),
            text: clean_text(text.as_ref()),
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// ── Posts ────────────────────────────────────────────────────────────────

/// One blog post. Image order is rendering order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    id: String,
    title: String,
    published: DateTime<FixedOffset>,
    content: String,
    #[serde(default)]
    images: Vec<ImageRef>,
    #[serde(default)]
    comment_count: u64,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        published: DateTime<FixedOffset>,
        content: impl AsRef<str>,
        images: Vec<ImageRef>,
        comment_count: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            published,
            content: clean_text(content.as_ref()),
            images,
            comment_count,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn published(&self) -> DateTime<FixedOffset> {
        self.published
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn comment_count(&self) -> u64 {
        self.comment_count
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Re-apply text cleanup; used after deserialising raw feed data.
    fn normalised(mut self) -> Self {
        self.content = clean_text(&self.content);
        self
    }
}

/// A post together with its comments, the unit the writer iterates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostEntry {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl PostEntry {
    pub fn new(post: Post, comments: Vec<Comment>) -> Self {
        Self { post, comments }
    }
}

/// A whole blog as loaded from a JSON feed export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogFeed {
    pub title: String,
    #[serde(default)]
    pub posts: Vec<PostEntry>,
}

impl BlogFeed {
    /// Parse a feed from JSON, cleaning every post and comment body.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut feed: BlogFeed = serde_json::from_str(json)?;
        for entry in &mut feed.posts {
            entry.post = entry.post.clone().normalised();
            entry.comments = entry
                .comments
                .iter()
                .map(|c| Comment::new(c.author.clone(), &c.text))
                .collect();
        }
        Ok(feed)
    }
}

// ── Selection ────────────────────────────────────────────────────────────

/// Inclusive range of calendar days shown on the title page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<FixedOffset>) -> bool {
        let day = at.date_naive();
        day >= self.start && day <= self.end
    }

    /// Smallest range covering every post; `None` for an empty slice.
    pub fn spanning(entries: &[PostEntry]) -> Option<Self> {
        let days = entries.iter().map(|e| e.post.published().date_naive());
        let start = days.clone().min()?;
        let end = days.max()?;
        Some(Self { start, end })
    }
}

/// Order in which posts become chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostOrder {
    Ascending,
    #[default]
    Descending,
}

/// Keep the posts published inside `range`, ordered by publish time.
///
/// The sort is stable, so posts sharing a timestamp keep their feed order.
pub fn select_posts(entries: &[PostEntry], range: DateRange, order: PostOrder) -> Vec<PostEntry> {
    let mut selected: Vec<PostEntry> = entries
        .iter()
        .filter(|e| range.contains(e.post.published()))
        .cloned()
        .collect();
    match order {
        PostOrder::Ascending => selected.sort_by_key(|e| e.post.published()),
        PostOrder::Descending => {
            selected.sort_by(|a, b| b.post.published().cmp(&a.post.published()))
        }
    }
    selected
}
