//! The chapter renderer: one stateless interpreter for every
//! [`LayoutStrategy`].
//!
//! Every chapter has the same skeleton: a centered title, a blank line, the
//! centered posting date, another blank line, then the strategy-specific
//! arrangement of images and body text, and finally the comment block. The
//! chapter always starts on a fresh page.
//!
//! Per-image failures never escape: a missing or undecodable image is
//! logged, recorded in the [`ChapterSummary`] and left out. Only document
//! failures are returned as errors.

use super::grid::{GridSummary, ImageGridComposer, CELL_PADDING};
use super::LayoutStrategy;
use crate::config::{LayoutOptions, PageGeometry};
use crate::error::{BookError, ElementError};
use crate::metrics;
use crate::model::{Comment, Post};
use crate::output::ChapterSummary;
use crate::pdf::element::{
    Alignment, Border, Chapter, Chunk, Element, ImageElement, Paragraph, Placement, WrapSide,
};
use crate::pdf::image::PdfImage;
use crate::pdf::Document;
use crate::resolve::ResolvedImage;
use crate::style::{Color, StyleRegistry};
use chrono::{DateTime, FixedOffset};
use std::fmt::Write as _;
use std::io::Write;
use tracing::{debug, warn};

/// Left and right indent of body text and the comment block.
pub const CONTENT_INDENT: f32 = 45.0;

/// Blank lines to append after text of height `text_height` so that it
/// clears an image of height `image_height`:
/// `ceil((image_height − text_height) / line_height) + 1`, or 0 when the
/// text is already at least as tall.
pub fn padding_lines(image_height: f32, text_height: f32, line_height: f32) -> usize {
    if line_height <= 0.0 || text_height >= image_height {
        return 0;
    }
    ((image_height - text_height) / line_height).ceil() as usize + 1
}

/// Width the body text is estimated against when an image of
/// `image_width` sits beside it. Margins count one and a half times and the
/// right margin is taken once more as a gutter.
pub fn wrap_text_width(geometry: &PageGeometry, image_width: f32) -> f32 {
    let left = geometry.margin_left * 1.5;
    let right = geometry.margin_right * 1.5;
    geometry.width - left - right - image_width - right
}

/// Format `at` with a `chrono` pattern, falling back to RFC 2822 if the
/// pattern is invalid.
pub fn format_date(at: DateTime<FixedOffset>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(pattern)).is_err() {
        return at.to_rfc2822();
    }
    out
}

/// Renders one post as one chapter.
///
/// Holds only borrowed, read-only configuration, so one renderer can be
/// shared by any number of sequential chapters.
#[derive(Debug, Clone, Copy)]
pub struct ChapterRenderer<'a> {
    styles: &'a StyleRegistry,
    options: &'a LayoutOptions,
    posting_date_format: &'a str,
}

/// Per-chapter bookkeeping while elements are built.
#[derive(Default)]
struct Draft {
    images_rendered: usize,
    padding_lines: usize,
    grid: Option<GridSummary>,
    comments_rendered: usize,
    skipped: Vec<ElementError>,
}

impl<'a> ChapterRenderer<'a> {
    pub fn new(
        styles: &'a StyleRegistry,
        options: &'a LayoutOptions,
        posting_date_format: &'a str,
    ) -> Self {
        Self {
            styles,
            options,
            posting_date_format,
        }
    }

    /// Append `post` to `doc` as chapter `chapter_number` laid out with
    /// `strategy`.
    ///
    /// `images` are the post's images already resolved, in post order.
    ///
    /// # Errors
    /// Only document failures ([`BookError`]); skipped images are reported
    /// in [`ChapterSummary::skipped`].
    #[allow(clippy::too_many_arguments)]
    pub fn render_chapter<W: Write>(
        &self,
        doc: &mut Document<W>,
        strategy: LayoutStrategy,
        post: &Post,
        images: &[ResolvedImage],
        comments: &[Comment],
        chapter_number: u32,
        include_comments: bool,
    ) -> Result<ChapterSummary, BookError> {
        debug!(
            "Rendering post {} as chapter {} with layout {}",
            post.id(),
            chapter_number,
            strategy
        );
        let geometry = *doc.geometry();
        let mut draft = Draft::default();
        let mut chapter = self.start_chapter(post, chapter_number);

        match strategy {
            LayoutStrategy::NoImage => {
                chapter.add(self.body(post));
            }
            LayoutStrategy::SingleWrap(side) => {
                self.single_wrap(&mut chapter, &mut draft, &geometry, post, images, side);
            }
            LayoutStrategy::CenteredTop => {
                if let Some(img) = self.first_image(&mut draft, images, &geometry) {
                    chapter.add(img);
                }
                chapter.add(self.body(post));
            }
            LayoutStrategy::CenteredBottom => {
                chapter.add(self.body(post));
                if let Some(img) = self.first_image(&mut draft, images, &geometry) {
                    chapter.add(img);
                }
            }
            LayoutStrategy::LeadingImages(leading) => {
                self.leading_images(&mut chapter, &mut draft, post, images, leading);
            }
            LayoutStrategy::Grid(columns) => {
                if !images.is_empty() {
                    let loaded = images
                        .iter()
                        .map(|image| self.load(&mut draft, image))
                        .collect();
                    let composer = ImageGridComposer::new(self.border(), self.cell_background());
                    let grid = composer.compose(loaded, columns, CELL_PADDING, geometry.body_width());
                    draft.images_rendered = grid.images_placed;
                    draft.grid = Some(grid.summary());
                    chapter.add(grid.table);
                }
                chapter.add(self.body(post));
            }
            LayoutStrategy::AlternateWrap => {
                self.alternate_wrap(&mut chapter, &mut draft, post, images);
            }
        }

        if include_comments && !comments.is_empty() {
            chapter.add(self.comments(comments));
            draft.comments_rendered = comments.len();
        }

        doc.soft_break();
        let first_page = doc.page_number();
        doc.add_chapter(&chapter)?;
        let last_page = doc.page_number();

        Ok(ChapterSummary {
            number: chapter_number,
            post_id: post.id().to_string(),
            title: post.title().to_string(),
            layout: strategy,
            images_requested: images.len(),
            images_rendered: draft.images_rendered,
            padding_lines: draft.padding_lines,
            grid: draft.grid,
            comments_rendered: draft.comments_rendered,
            first_page,
            last_page,
            skipped: draft.skipped,
        })
    }

    // ── Skeleton ─────────────────────────────────────────────────────────

    fn start_chapter(&self, post: &Post, number: u32) -> Chapter {
        let fonts = &self.styles.fonts;
        let title = Paragraph::new(post.title(), fonts.content_title).aligned(Alignment::Center);
        let mut chapter = Chapter::new(number, title);
        chapter.add(Paragraph::blank_line(fonts.content));
        chapter.add(
            Paragraph::new(self.posting_date(post), fonts.posting_date).aligned(Alignment::Center),
        );
        chapter.add(Paragraph::blank_line(fonts.content));
        chapter
    }

    fn posting_date(&self, post: &Post) -> String {
        format_date(post.published(), self.posting_date_format)
    }

    fn body(&self, post: &Post) -> Paragraph {
        let font = self.styles.fonts.content;
        let mut p = Paragraph::new(post.text(), font).indented(CONTENT_INDENT, CONTENT_INDENT);
        p.push(Chunk::newline(font));
        p
    }

    fn comments(&self, comments: &[Comment]) -> Paragraph {
        let fonts = &self.styles.fonts;
        let mut p = Paragraph::empty().indented(CONTENT_INDENT, CONTENT_INDENT);
        p.push(Chunk::new("Comments:", fonts.comment_title));
        p.push(Chunk::newline(fonts.content));
        for comment in comments {
            p.push(Chunk::new(
                format!("by {} -- {}", comment.author(), comment.text()),
                fonts.comment,
            ));
            p.push(Chunk::newline(fonts.content));
        }
        p
    }

    // ── Images ───────────────────────────────────────────────────────────

    fn border(&self) -> Option<Border> {
        self.options.image_border.then_some(Border {
            width: self.options.image_border_width,
            color: self.styles.colors.image_border,
        })
    }

    fn cell_background(&self) -> Option<Color> {
        self.options
            .use_image_background
            .then_some(self.styles.colors.image_background)
    }

    fn load(&self, draft: &mut Draft, image: &ResolvedImage) -> Option<PdfImage> {
        match image.load() {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("{}", e);
                draft.skipped.push(e);
                None
            }
        }
    }

    /// Load `image` as a placed element, counting it as rendered.
    fn element(
        &self,
        draft: &mut Draft,
        image: &ResolvedImage,
        placement: Placement,
    ) -> Option<ImageElement> {
        let img = self.load(draft, image)?;
        draft.images_rendered += 1;
        Some(ImageElement::new(img, placement).with_border(self.border()))
    }

    fn first_image(
        &self,
        draft: &mut Draft,
        images: &[ResolvedImage],
        geometry: &PageGeometry,
    ) -> Option<ImageElement> {
        let mut el = self.element(draft, images.first()?, Placement::Centered)?;
        el.fit_within(geometry.body_width(), geometry.body_height());
        Some(el)
    }

    // ── Strategies ───────────────────────────────────────────────────────

    fn single_wrap(
        &self,
        chapter: &mut Chapter,
        draft: &mut Draft,
        geometry: &PageGeometry,
        post: &Post,
        images: &[ResolvedImage],
        side: WrapSide,
    ) {
        let image = images
            .first()
            .and_then(|image| self.element(draft, image, Placement::Wrap(side)))
            .map(|mut el| {
                el.fit_within(geometry.body_width(), geometry.body_height());
                el
            });

        let mut body = self.body(post);
        if let Some(img) = &image {
            let font = self.styles.fonts.content;
            let line_height = body.leading();
            let text_width = wrap_text_width(geometry, img.width()).max(0.0);
            match metrics::try_estimate_line_count(post.text(), &font, text_width) {
                Ok(lines) => {
                    let text_height = lines as f32 * line_height;
                    let image_height = img.height() + line_height - 1.0;
                    let pad = padding_lines(image_height, text_height, line_height);
                    debug!(
                        "Wrap estimate: {} lines at {:.1}pt, image {:.1}pt → {} padding lines",
                        lines, text_width, image_height, pad
                    );
                    body.push_blank_lines(pad, font);
                    draft.padding_lines = pad;
                }
                Err(e) => {
                    warn!("{}", e);
                    draft.skipped.push(e);
                }
            }
        }

        if let Some(img) = image {
            chapter.add(img);
        }
        chapter.add(body);
    }

    fn leading_images(
        &self,
        chapter: &mut Chapter,
        draft: &mut Draft,
        post: &Post,
        images: &[ResolvedImage],
        leading: usize,
    ) {
        for image in images.iter().take(leading) {
            if let Some(el) = self.element(draft, image, Placement::Centered) {
                chapter.add(el);
            }
        }
        chapter.add(self.body(post));

        for (i, image) in images.iter().enumerate().skip(leading) {
            if i % 2 == 1 {
                chapter.add(Element::PageBreak);
                chapter.add(
                    Paragraph::new(
                        format!("{} (cont'd)", self.posting_date(post)),
                        self.styles.fonts.posting_date,
                    )
                    .indented(CONTENT_INDENT, 0.0),
                );
            }
            if let Some(el) = self.element(draft, image, Placement::Centered) {
                chapter.add(el);
            }
        }
    }

    fn alternate_wrap(
        &self,
        chapter: &mut Chapter,
        draft: &mut Draft,
        post: &Post,
        images: &[ResolvedImage],
    ) {
        if let Some(first) = images.first() {
            if let Some(el) = self.element(draft, first, Placement::Wrap(WrapSide::Left)) {
                chapter.add(el);
            }
        }
        chapter.add(self.body(post));

        for (i, image) in images.iter().enumerate().skip(1) {
            let side = if i % 2 == 0 { WrapSide::Left } else { WrapSide::Right };
            if let Some(el) = self.element(draft, image, Placement::Wrap(side)) {
                chapter.add(el);
                chapter.add(Paragraph::blank_line(self.styles.fonts.content));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{ColorSet, FontFamily};
    use std::path::Path;

    fn post(text: &str) -> Post {
        Post::new(
            "p1",
            "A day out",
            DateTime::parse_from_rfc3339("2012-07-04T12:00:00-05:00").unwrap(),
            text,
            vec![],
            0,
        )
    }

    fn png(dir: &Path, name: &str, w: u32, h: u32) -> ResolvedImage {
        let path = dir.join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb([90, 90, 200]))
            .save(&path)
            .unwrap();
        ResolvedImage::Local {
            source: name.to_string(),
            path,
        }
    }

    fn missing(name: &str) -> ResolvedImage {
        ResolvedImage::Local {
            source: name.to_string(),
            path: Path::new("/no/such/dir").join(name),
        }
    }

    fn doc() -> Document<Vec<u8>> {
        Document::new(Vec::new(), PageGeometry::A4, Color::WHITE)
    }

    #[test]
    fn padding_formula() {
        assert_eq!(padding_lines(18.0 * 5.0, 18.0 * 2.0, 18.0), 4);
        assert_eq!(padding_lines(100.0, 0.0, 18.0), 7);
        assert_eq!(padding_lines(50.0, 50.0, 18.0), 0);
        assert_eq!(padding_lines(10.0, 90.0, 18.0), 0);
    }

    #[test]
    fn three_line_gap_pads_at_least_four_lines() {
        for text_lines in 0..5 {
            let text_height = text_lines as f32 * 18.0;
            assert!(padding_lines(text_height + 3.0 * 18.0, text_height, 18.0) >= 4);
        }
    }

    #[test]
    fn wrap_width_formula() {
        // 595 − 54 − 54 − 200 − 54
        assert_eq!(wrap_text_width(&PageGeometry::A4, 200.0), 233.0);
    }

    #[test]
    fn posting_date_format() {
        let p = post("x");
        assert_eq!(
            format_date(p.published(), "%A, %B %d, %Y"),
            "Wednesday, July 04, 2012"
        );
    }

    #[test]
    fn no_image_chapter() {
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let mut d = doc();
        let s = r
            .render_chapter(&mut d, LayoutStrategy::NoImage, &post("Hello"), &[], &[], 1, true)
            .unwrap();
        assert_eq!(s.number, 1);
        assert_eq!(s.images_requested, 0);
        assert_eq!((s.first_page, s.last_page), (1, 1));
        assert_eq!(d.chapter_count(), 1);
    }

    #[test]
    fn wrap_pads_short_text_beside_tall_image() {
        let dir = tempfile::tempdir().unwrap();
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let images = [png(dir.path(), "tall.png", 120, 90)];
        let s = r
            .render_chapter(
                &mut doc(),
                LayoutStrategy::SingleWrap(WrapSide::Left),
                &post("Short."),
                &images,
                &[],
                1,
                false,
            )
            .unwrap();
        // image 90 + 18 − 1 = 107 → ceil(107 / 18) + 1
        assert_eq!(s.padding_lines, 7);
        assert_eq!(s.images_rendered, 1);
    }

    #[test]
    fn missing_wrap_image_leaves_body_only() {
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let s = r
            .render_chapter(
                &mut doc(),
                LayoutStrategy::SingleWrap(WrapSide::Right),
                &post("Body"),
                &[missing("gone.png")],
                &[],
                1,
                true,
            )
            .unwrap();
        assert_eq!(s.images_rendered, 0);
        assert_eq!(s.padding_lines, 0);
        assert!(matches!(
            s.skipped.as_slice(),
            [ElementError::ResourceMissing { reference, .. }] if reference == "gone.png"
        ));
    }

    #[test]
    fn unknown_metrics_skip_padding() {
        let dir = tempfile::tempdir().unwrap();
        let styles = StyleRegistry::with_family(FontFamily::TimesRoman, ColorSet::default());
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let s = r
            .render_chapter(
                &mut doc(),
                LayoutStrategy::SingleWrap(WrapSide::Left),
                &post("Short."),
                &[png(dir.path(), "a.png", 60, 200)],
                &[],
                1,
                false,
            )
            .unwrap();
        assert_eq!(s.padding_lines, 0);
        assert!(matches!(
            s.skipped.as_slice(),
            [ElementError::MetricsUnavailable { .. }]
        ));
    }

    #[test]
    fn leading_images_break_before_odd_indices() {
        let dir = tempfile::tempdir().unwrap();
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let images: Vec<ResolvedImage> = (0..4)
            .map(|i| png(dir.path(), &format!("{i}.png"), 40, 40))
            .collect();
        let s = r
            .render_chapter(
                &mut doc(),
                LayoutStrategy::LeadingImages(1),
                &post("Body"),
                &images,
                &[],
                1,
                false,
            )
            .unwrap();
        // breaks before images 1 and 3
        assert_eq!(s.last_page - s.first_page, 2);
        assert_eq!(s.images_rendered, 4);
    }

    #[test]
    fn grid_chapter_reports_shape() {
        let dir = tempfile::tempdir().unwrap();
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let images: Vec<ResolvedImage> = (0..3)
            .map(|i| png(dir.path(), &format!("{i}.png"), 300, 200))
            .collect();
        let s = r
            .render_chapter(&mut doc(), LayoutStrategy::Grid(2), &post("Body"), &images, &[], 2, false)
            .unwrap();
        let grid = s.grid.unwrap();
        assert_eq!((grid.rows, grid.blank_cells, grid.images_placed), (2, 1, 3));
    }

    #[test]
    fn comments_render_when_enabled() {
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let comments = [Comment::new("Ann", "Lovely!"), Comment::new("Bob", "Great")];
        let on = r
            .render_chapter(&mut doc(), LayoutStrategy::NoImage, &post("x"), &[], &comments, 1, true)
            .unwrap();
        assert_eq!(on.comments_rendered, 2);
        let off = r
            .render_chapter(&mut doc(), LayoutStrategy::NoImage, &post("x"), &[], &comments, 1, false)
            .unwrap();
        assert_eq!(off.comments_rendered, 0);
    }

    #[test]
    fn comment_block_format() {
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let p = r.comments(&[Comment::new("Ann", "Lovely!")]);
        assert_eq!(p.plain_text(), "Comments:\nby Ann -- Lovely!\n");
        assert_eq!(p.indent_left, CONTENT_INDENT);
    }

    #[test]
    fn alternate_wrap_sides() {
        let dir = tempfile::tempdir().unwrap();
        let styles = StyleRegistry::default();
        let options = LayoutOptions::default();
        let r = ChapterRenderer::new(&styles, &options, "%A, %B %d, %Y");
        let images: Vec<ResolvedImage> = (0..3)
            .map(|i| png(dir.path(), &format!("{i}.png"), 30, 30))
            .collect();
        let mut chapter = Chapter::new(1, Paragraph::empty());
        let mut draft = Draft::default();
        r.alternate_wrap(&mut chapter, &mut draft, &post("Body"), &images);
        let sides: Vec<Placement> = chapter
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Image(i) => Some(i.placement),
                _ => None,
            })
            .collect();
        assert_eq!(
            sides,
            [
                Placement::Wrap(WrapSide::Left),
                Placement::Wrap(WrapSide::Right),
                Placement::Wrap(WrapSide::Left)
            ]
        );
        assert_eq!(draft.images_rendered, 3);
    }
}
