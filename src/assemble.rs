//! Whole-document entry points.
//!
//! ## Why one writer per call?
//!
//! A [`BookWriter`] owns only immutable configuration. Each `write*` call
//! builds its own [`Document`] and walks it through the same sequence:
//!
//! ```text
//! open → title page → reset pagination → chapters → trailing blank → close
//! ```
//!
//! so one writer can serve any number of independent books, from several
//! threads if needed. Within a call everything is sequential: the document is
//! an append-only stream with a single page cursor.
//!
//! Any [`BookError`] aborts the whole write. [`BookWriter::write_to_file`]
//! writes to a sibling temp file and renames it on success, so a failed
//! write never leaves a truncated PDF behind.

use crate::config::WriterConfig;
use crate::error::BookError;
use crate::layout::render::ChapterRenderer;
use crate::layout::LayoutSelector;
use crate::model::{DateRange, PostEntry};
use crate::output::WriteSummary;
use crate::pdf::element::{Alignment, Paragraph};
use crate::pdf::{Band, Document};
use crate::progress::StatusEvent;
use crate::resolve::{ImageResolver, ResolvedImage};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Spacer lines above the title on the title page.
const TITLE_PAGE_SPACERS: usize = 5;
/// Document-info subject.
const SUBJECT: &str = "Blog";

/// Writes blogs as paginated PDF books.
#[derive(Debug, Clone, Default)]
pub struct BookWriter {
    config: WriterConfig,
}

impl BookWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Write `entries` as a book to `out`, one chapter per entry in the
    /// given order.
    ///
    /// `range` is only printed on the title page; entries are neither
    /// filtered nor re-sorted (see [`crate::model::select_posts`]).
    ///
    /// # Errors
    /// Any document failure. Missing images are not errors; they are
    /// reported in [`WriteSummary::skipped`].
    pub fn write<W: Write>(
        &self,
        title: &str,
        range: DateRange,
        entries: &[PostEntry],
        resolver: &dyn ImageResolver,
        out: W,
    ) -> Result<WriteSummary, BookError> {
        self.write_document(title, range, entries, resolver, out)
            .map(|(_, summary)| summary)
    }

    /// Like [`BookWriter::write`], returning the PDF bytes.
    pub fn write_to_vec(
        &self,
        title: &str,
        range: DateRange,
        entries: &[PostEntry],
        resolver: &dyn ImageResolver,
    ) -> Result<(Vec<u8>, WriteSummary), BookError> {
        self.write_document(title, range, entries, resolver, Vec::new())
    }

    /// Write the book to `path`.
    ///
    /// Uses atomic write (temp file + rename) so the destination is either
    /// the complete document or untouched.
    pub fn write_to_file(
        &self,
        title: &str,
        range: DateRange,
        entries: &[PostEntry],
        resolver: &dyn ImageResolver,
        path: impl AsRef<Path>,
    ) -> Result<WriteSummary, BookError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BookError::OutputOpenFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let tmp_path = path.with_extension("pdf.tmp");
        let file = File::create(&tmp_path).map_err(|e| BookError::OutputOpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let result = self
            .write(title, range, entries, resolver, BufWriter::new(file))
            .and_then(|summary| {
                std::fs::rename(&tmp_path, path).map_err(|e| BookError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                Ok(summary)
            });

        if result.is_err() {
            if let Err(e) = std::fs::remove_file(&tmp_path) {
                debug!("Could not remove {}: {}", tmp_path.display(), e);
            }
        }
        result
    }

    fn write_document<W: Write>(
        &self,
        title: &str,
        range: DateRange,
        entries: &[PostEntry],
        resolver: &dyn ImageResolver,
        out: W,
    ) -> Result<(W, WriteSummary), BookError> {
        let start = Instant::now();
        let config = &self.config;
        let styles = &*config.styles;
        info!("Starting book '{}' with {} posts", title, entries.len());

        // ── Open ─────────────────────────────────────────────────────────
        let mut doc = Document::new(out, config.geometry, styles.colors.document_background);
        {
            let info = doc.info_mut();
            info.title = Some(title.to_string());
            info.subject = Some(SUBJECT.to_string());
            info.creator = Some(concat!("blogbook ", env!("CARGO_PKG_VERSION")).to_string());
            info.creation_date = Some(chrono::Local::now().naive_local());
        }

        // ── Title page ───────────────────────────────────────────────────
        self.emit(StatusEvent::TitlePage);
        self.write_title_page(&mut doc, title, range)?;
        doc.soft_break();

        // ── Pagination ───────────────────────────────────────────────────
        doc.reset_page_count();
        doc.set_header(Some(Band::fixed(
            format!("{title} Blog"),
            styles.fonts.content,
            styles.colors.header_footer_background,
        )));
        doc.set_footer(Some(Band::numbered(
            "- Page ",
            " -",
            styles.fonts.content,
            styles.colors.header_footer_background,
        )));

        // ── Chapters ─────────────────────────────────────────────────────
        self.emit(StatusEvent::Content {
            total_posts: entries.len(),
        });
        let selector = LayoutSelector::new(&config.layout);
        let renderer =
            ChapterRenderer::new(styles, &config.layout, &config.posting_date_format);
        let mut summary = WriteSummary {
            title: title.to_string(),
            ..Default::default()
        };

        for (index, entry) in entries.iter().enumerate() {
            let number = index as u32 + 1;
            let post = &entry.post;

            let images: Vec<ResolvedImage> = if post.has_images() {
                self.emit(StatusEvent::DownloadingImages {
                    chapter: number,
                    images: post.images().len(),
                });
                post.images()
                    .iter()
                    .map(|image| resolver.resolve(post, image))
                    .collect()
            } else {
                Vec::new()
            };

            let strategy = selector.select(images.len());
            self.emit(StatusEvent::WritingPost {
                chapter: number,
                title: post.title().to_string(),
            });
            info!(
                "Writing post {}/{} '{}' as {}",
                number,
                entries.len(),
                post.title(),
                strategy
            );

            let chapter = renderer.render_chapter(
                &mut doc,
                strategy,
                post,
                &images,
                &entry.comments,
                number,
                config.include_comments,
            );
            // Temp image files go away here whatever the outcome.
            drop(images);
            summary.chapters.push(chapter?);
        }

        // ── Trailing blank ───────────────────────────────────────────────
        self.emit(StatusEvent::Completing);
        doc.soft_break();
        if config.trailing_blank {
            let before = doc.page_count();
            doc.add_marker(title, "");
            if doc.page_number() % 2 == 1 {
                doc.hard_break();
            }
            doc.hard_break();
            doc.hard_break();
            summary.trailing_blank_pages = doc.page_count() - before;
        }

        // ── Close ────────────────────────────────────────────────────────
        summary.physical_pages = doc.page_count();
        summary.content_pages = summary.physical_pages.saturating_sub(1) as u32;
        let out = doc.close()?;
        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Book '{}' complete: {} chapters, {} pages, {} of {} images in {}ms",
            title,
            summary.chapters.len(),
            summary.physical_pages,
            summary.images_rendered(),
            summary.images_requested(),
            summary.duration_ms
        );
        self.emit(StatusEvent::Complete);
        Ok((out, summary))
    }

    fn write_title_page<W: Write>(
        &self,
        doc: &mut Document<W>,
        title: &str,
        range: DateRange,
    ) -> Result<(), BookError> {
        let fonts = &self.config.styles.fonts;
        for _ in 0..TITLE_PAGE_SPACERS {
            doc.add(&Paragraph::blank_line(fonts.document_title).into())?;
        }
        doc.add(&Paragraph::new(title, fonts.document_title).aligned(Alignment::Center).into())?;
        doc.add(&Paragraph::blank_line(fonts.document_title).into())?;

        let pattern = &self.config.title_date_format;
        let dates = format!(
            "{} to {}",
            format_day(range.start, pattern),
            format_day(range.end, pattern)
        );
        doc.add(&Paragraph::new(dates, fonts.document_date).aligned(Alignment::Center).into())
    }

    fn emit(&self, event: StatusEvent) {
        debug!("Status: {}", event);
        if let Some(sink) = &self.config.status_sink {
            sink.on_status(&event);
        }
    }
}

/// Format a calendar day, falling back to ISO 8601 for a bad pattern.
fn format_day(day: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", day.format(pattern)).is_err() {
        return day.to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageRef, Post};
    use crate::progress::ChannelStatusSink;
    use std::cell::Cell;
    use std::sync::{mpsc, Arc};

    struct CountingResolver {
        calls: Cell<usize>,
    }

    impl ImageResolver for CountingResolver {
        fn resolve(&self, _post: &Post, image: &ImageRef) -> ResolvedImage {
            self.calls.set(self.calls.get() + 1);
            ResolvedImage::Unresolved {
                source: image.source.clone(),
                detail: "offline".into(),
            }
        }
    }

    fn entry(id: &str, images: usize) -> PostEntry {
        PostEntry::new(
            Post::new(
                id,
                format!("Post {id}"),
                chrono::DateTime::parse_from_rfc3339("2011-03-05T08:00:00Z").unwrap(),
                "Some text.",
                (0..images).map(|i| ImageRef::new(format!("{id}-{i}.jpg"))).collect(),
                0,
            ),
            vec![],
        )
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2011, 12, 31).unwrap(),
        )
    }

    #[test]
    fn date_range_on_title_page_uses_pattern() {
        assert_eq!(
            format_day(NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(), "%B %d, %Y"),
            "January 01, 2011"
        );
    }

    #[test]
    fn resolver_skipped_for_posts_without_images() {
        let resolver = CountingResolver { calls: Cell::new(0) };
        let entries = [entry("a", 0), entry("b", 2), entry("c", 0)];
        let (_, summary) = BookWriter::default()
            .write_to_vec("Family", range(), &entries, &resolver)
            .unwrap();
        assert_eq!(resolver.calls.get(), 2);
        assert_eq!(summary.chapters.len(), 3);
        assert_eq!(summary.images_rendered(), 0);
        assert_eq!(summary.skipped().count(), 2);
    }

    #[test]
    fn trailing_blank_leaves_even_page_count() {
        let resolver = CountingResolver { calls: Cell::new(0) };
        for posts in 1..=3 {
            let entries: Vec<PostEntry> = (0..posts).map(|i| entry(&i.to_string(), 0)).collect();
            let (_, summary) = BookWriter::default()
                .write_to_vec("Family", range(), &entries, &resolver)
                .unwrap();
            assert_eq!(summary.physical_pages % 2, 0, "posts={posts}");
            assert!(summary.trailing_blank_pages >= 2);
        }
    }

    #[test]
    fn no_trailing_blank_when_disabled() {
        let config = WriterConfig::builder().trailing_blank(false).build().unwrap();
        let resolver = CountingResolver { calls: Cell::new(0) };
        let (_, summary) = BookWriter::new(config)
            .write_to_vec("Family", range(), &[entry("a", 0)], &resolver)
            .unwrap();
        assert_eq!(summary.trailing_blank_pages, 0);
        // title page + one chapter page
        assert_eq!(summary.physical_pages, 2);
        assert_eq!(summary.content_pages, 1);
    }

    #[test]
    fn status_events_in_order() {
        let (tx, rx) = mpsc::channel();
        let config = WriterConfig::builder()
            .status_sink(Arc::new(ChannelStatusSink::new(tx)))
            .build()
            .unwrap();
        let resolver = CountingResolver { calls: Cell::new(0) };
        BookWriter::new(config)
            .write_to_vec("Family", range(), &[entry("a", 0), entry("b", 1)], &resolver)
            .unwrap();
        let events: Vec<StatusEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            [
                StatusEvent::TitlePage,
                StatusEvent::Content { total_posts: 2 },
                StatusEvent::WritingPost {
                    chapter: 1,
                    title: "Post a".into()
                },
                StatusEvent::DownloadingImages {
                    chapter: 2,
                    images: 1
                },
                StatusEvent::WritingPost {
                    chapter: 2,
                    title: "Post b".into()
                },
                StatusEvent::Completing,
                StatusEvent::Complete,
            ]
        );
    }

    #[test]
    fn output_is_a_pdf() {
        let resolver = CountingResolver { calls: Cell::new(0) };
        let (bytes, _) = BookWriter::default()
            .write_to_vec("Family", range(), &[entry("a", 0)], &resolver)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
