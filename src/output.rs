//! Results returned from a document write.

use crate::error::ElementError;
use crate::layout::grid::GridSummary;
use crate::layout::LayoutStrategy;
use serde::Serialize;

/// What happened to one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterSummary {
    /// Chapter number, starting at 1 in input order.
    pub number: u32,
    pub post_id: String,
    pub title: String,
    pub layout: LayoutStrategy,
    pub images_requested: usize,
    pub images_rendered: usize,
    /// Blank lines appended to the body so text clears a wrapped image.
    pub padding_lines: usize,
    /// Present when the images were laid out as a grid.
    pub grid: Option<GridSummary>,
    pub comments_rendered: usize,
    /// Content page the chapter starts on.
    pub first_page: u32,
    /// Content page the chapter ends on.
    pub last_page: u32,
    /// Elements that were dropped, in the order they were hit.
    pub skipped: Vec<ElementError>,
}

/// Statistics for a whole write.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteSummary {
    pub title: String,
    pub chapters: Vec<ChapterSummary>,
    /// Pages numbered in the footer (everything after the title page).
    pub content_pages: u32,
    /// Pages in the output, title page and blank padding included.
    pub physical_pages: usize,
    /// Blank pages appended for print binding.
    pub trailing_blank_pages: usize,
    /// Wall-clock time for the write, in milliseconds.
    pub duration_ms: u64,
}

impl WriteSummary {
    pub fn images_requested(&self) -> usize {
        self.chapters.iter().map(|c| c.images_requested).sum()
    }

    pub fn images_rendered(&self) -> usize {
        self.chapters.iter().map(|c| c.images_rendered).sum()
    }

    /// Every element skipped across all chapters.
    pub fn skipped(&self) -> impl Iterator<Item = (u32, &ElementError)> {
        self.chapters
            .iter()
            .flat_map(|c| c.skipped.iter().map(move |e| (c.number, e)))
    }
}
