//! Append-only PDF document built on `pdf-writer`.
//!
//! ## Why an append-only model?
//!
//! The chapter renderers only ever add content at the cursor: a paragraph,
//! an image, a table, a page break. Once a page is finished its content
//! stream is compressed and written into the PDF object graph and is never
//! touched again. This keeps memory proportional to one page of layout state
//! and makes the page numbering a simple counter.
//!
//! Pages are created lazily, the first time something is drawn, so a
//! [`Document::soft_break`] on a page that is still empty does nothing while
//! [`Document::hard_break`] always emits a page (blank if need be).
//!
//! Floating images ([`Placement::Wrap`]) reserve a strip against one margin;
//! lines laid out beside the strip are narrowed until the cursor passes the
//! image bottom.

pub mod element;
pub mod image;
pub mod text;

use crate::config::PageGeometry;
use crate::error::BookError;
use crate::style::{Color, FontSpec};
use chrono::{Datelike, NaiveDateTime, Timelike};
use element::{Alignment, Border, Chapter, Element, ImageElement, Paragraph, Placement, Table, WrapSide};
use pdf_writer::types::PageMode;
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::BTreeMap;
use std::io::Write;
use text::{encode_win_ansi, Line, LineBreaker};
use tracing::debug;

/// Vertical padding inside header and footer bands.
const BAND_PADDING: f32 = 3.0;
/// Horizontal gap between a floating image and the text beside it.
const WRAP_GAP: f32 = 12.0;
/// Narrowest line worth setting beside a float; below this the text drops
/// under the image.
const MIN_LINE_WIDTH: f32 = 36.0;
/// Space left under a block image.
const IMAGE_SPACING: f32 = 6.0;

// ── Header / footer bands ────────────────────────────────────────────────

/// A one-line band drawn at the top or bottom of every page.
///
/// A numbered band prints `before`, the page number, then `after`.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub before: String,
    pub after: Option<String>,
    pub font: FontSpec,
    pub background: Color,
    pub alignment: Alignment,
}

impl Band {
    pub fn fixed(text: impl Into<String>, font: FontSpec, background: Color) -> Self {
        Self {
            before: text.into(),
            after: None,
            font,
            background,
            alignment: Alignment::Center,
        }
    }

    pub fn numbered(
        before: impl Into<String>,
        after: impl Into<String>,
        font: FontSpec,
        background: Color,
    ) -> Self {
        Self {
            before: before.into(),
            after: Some(after.into()),
            font,
            background,
            alignment: Alignment::Center,
        }
    }

    /// Text shown on page `number`.
    pub fn text_for(&self, number: u32) -> String {
        match &self.after {
            Some(after) => format!("{}{}{}", self.before, number, after),
            None => self.before.clone(),
        }
    }

    fn height(&self) -> f32 {
        self.font.leading() + 2.0 * BAND_PADDING
    }
}

// ── Document info ────────────────────────────────────────────────────────

/// Values written to the PDF document information dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub creation_date: Option<NaiveDateTime>,
    /// Extra `key → value` entries.
    pub markers: Vec<(String, String)>,
}

// ── Page state ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Float {
    side: WrapSide,
    left: f32,
    right: f32,
    bottom: f32,
}

struct PageState {
    id: Ref,
    content_id: Ref,
    number: u32,
    content: Content,
    /// Top of the body area, below any header band.
    top: f32,
    /// Bottom of the body area, above any footer band.
    bottom: f32,
    cursor: f32,
    has_content: bool,
    floats: Vec<Float>,
    fonts: BTreeMap<String, Ref>,
    x_objects: BTreeMap<String, Ref>,
}

impl PageState {
    /// Horizontal span free for a line whose top edge is at `top`.
    fn span(&self, mut x0: f32, mut x1: f32, top: f32) -> (f32, f32) {
        for f in self.floats.iter().filter(|f| f.bottom < top) {
            match f.side {
                WrapSide::Left => x0 = x0.max(f.right + WRAP_GAP),
                WrapSide::Right => x1 = x1.min(f.left - WRAP_GAP),
            }
        }
        (x0, x1)
    }

    /// Move the cursor below every float and forget them.
    fn clear_floats(&mut self) {
        if let Some(lowest) = self.floats.iter().map(|f| f.bottom).reduce(f32::min) {
            self.cursor = self.cursor.min(lowest);
        }
        self.floats.clear();
    }

    fn expire_floats(&mut self) {
        let cursor = self.cursor;
        self.floats.retain(|f| f.bottom < cursor);
    }

    fn body_height(&self) -> f32 {
        self.top - self.bottom
    }
}

struct FinishedPage {
    id: Ref,
    content_id: Ref,
    fonts: BTreeMap<String, Ref>,
    x_objects: BTreeMap<String, Ref>,
}

struct OutlineEntry {
    title: String,
    page: Ref,
    top: f32,
}

// ── Document ─────────────────────────────────────────────────────────────

/// An append-only paginated PDF bound to an output sink.
///
/// Nothing reaches the sink until [`Document::close`].
pub struct Document<W: Write> {
    sink: W,
    geometry: PageGeometry,
    background: Color,
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    pages_id: Ref,
    /// Base font name → (resource name, object id).
    fonts: BTreeMap<&'static str, (String, Ref)>,
    image_count: usize,
    finished: Vec<FinishedPage>,
    current: Option<PageState>,
    next_page_number: u32,
    header: Option<Band>,
    footer: Option<Band>,
    outline: Vec<OutlineEntry>,
    info: DocumentInfo,
}

impl<W: Write> Document<W> {
    pub fn new(sink: W, geometry: PageGeometry, background: Color) -> Self {
        let mut doc = Self {
            sink,
            geometry,
            background,
            pdf: Pdf::new(),
            next_id: 1,
            catalog_id: Ref::new(1),
            pages_id: Ref::new(2),
            fonts: BTreeMap::new(),
            image_count: 0,
            finished: Vec::new(),
            current: None,
            next_page_number: 1,
            header: None,
            footer: None,
            outline: Vec::new(),
            info: DocumentInfo::default(),
        };
        doc.catalog_id = doc.alloc();
        doc.pages_id = doc.alloc();
        doc
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn info_mut(&mut self) -> &mut DocumentInfo {
        &mut self.info
    }

    /// Add a custom entry to the document information dictionary.
    pub fn add_marker(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.markers.push((key.into(), value.into()));
    }

    /// Header for pages started from now on.
    pub fn set_header(&mut self, band: Option<Band>) {
        self.header = band;
    }

    /// Footer for pages started from now on.
    pub fn set_footer(&mut self, band: Option<Band>) {
        self.footer = band;
    }

    /// Number of the current page, or of the next page if none is open.
    pub fn page_number(&self) -> u32 {
        self.current
            .as_ref()
            .map(|p| p.number)
            .unwrap_or(self.next_page_number)
    }

    /// Number the next page started as page 1.
    pub fn reset_page_count(&mut self) {
        self.next_page_number = 1;
    }

    /// Pages emitted so far, counting an open page only if it has content.
    pub fn page_count(&self) -> usize {
        self.finished.len()
            + self
                .current
                .as_ref()
                .map_or(0, |p| usize::from(p.has_content))
    }

    pub fn chapter_count(&self) -> usize {
        self.outline.len()
    }

    /// Finish the current page if anything has been drawn on it.
    pub fn soft_break(&mut self) {
        if let Some(page) = self.current.take() {
            if page.has_content {
                self.finish_page(page);
            } else {
                self.current = Some(page);
            }
        }
    }

    /// Finish the current page, starting (and emitting) a blank one if
    /// none is open.
    pub fn hard_break(&mut self) {
        let page = self.take_page();
        self.finish_page(page);
    }

    pub fn add(&mut self, element: &Element) -> Result<(), BookError> {
        match element {
            Element::Paragraph(p) => self.add_paragraph(p),
            Element::Image(i) => self.add_image(i),
            Element::Table(t) => self.add_table(t),
            Element::PageBreak => {
                self.soft_break();
                Ok(())
            }
        }
    }

    /// Append a chapter and record an outline entry pointing at its title.
    pub fn add_chapter(&mut self, chapter: &Chapter) -> Result<(), BookError> {
        let page = self.take_page();
        self.outline.push(OutlineEntry {
            title: chapter.bookmark_title(),
            page: page.id,
            top: page.cursor,
        });
        self.current = Some(page);

        self.add_paragraph(&chapter.title)?;
        for element in &chapter.elements {
            self.add(element)?;
        }
        debug!(
            "Chapter {} added ({} elements, now on page {})",
            chapter.number,
            chapter.elements.len(),
            self.page_number()
        );
        Ok(())
    }

    // ── Elements ─────────────────────────────────────────────────────────

    fn add_paragraph(&mut self, p: &Paragraph) -> Result<(), BookError> {
        let g = self.geometry;
        let mut page = self.take_page();
        if page.has_content {
            page.cursor -= p.spacing_before;
        }

        let probe = p.leading();
        let x_left = g.margin_left + p.indent_left;
        let x_right = g.width - g.margin_right - p.indent_right;
        let mut breaker = LineBreaker::new(p.chunks.iter().map(|c| (c.text.as_str(), c.font)));

        while !breaker.is_done() {
            if page.cursor - probe < page.bottom && page.has_content {
                page = self.turn_page(page);
            }
            let (x0, x1) = page.span(x_left, x_right, page.cursor);
            if x1 - x0 < MIN_LINE_WIDTH && !page.floats.is_empty() {
                page.clear_floats();
                continue;
            }
            let Some(line) = breaker.next_line(x1 - x0) else {
                break;
            };
            let leading = if line.leading > 0.0 { line.leading } else { probe };
            if !line.fragments.is_empty() {
                let x = match p.alignment {
                    Alignment::Left => x0,
                    Alignment::Center => x0 + ((x1 - x0) - line.width) / 2.0,
                    Alignment::Right => x1 - line.width,
                };
                let baseline = page.cursor - (leading - line.max_size) / 2.0 - line.max_size * 0.8;
                self.show_line(&mut page, x, baseline, &line);
            }
            page.cursor -= leading;
            page.has_content = true;
            page.expire_floats();
        }

        page.cursor -= p.spacing_after;
        self.current = Some(page);
        Ok(())
    }

    fn add_image(&mut self, img: &ImageElement) -> Result<(), BookError> {
        let g = self.geometry;
        let mut page = self.take_page();
        page.clear_floats();

        let (w, h) = fit_box(img.width(), img.height(), g.body_width(), page.body_height());
        if page.cursor - h < page.bottom && page.has_content {
            page = self.turn_page(page);
        }
        let y = page.cursor - h;
        match img.placement {
            Placement::Centered => {
                let x = g.margin_left + (g.body_width() - w) / 2.0;
                self.draw_image(&mut page, img, x, y, w, h);
                page.cursor = y - IMAGE_SPACING;
            }
            Placement::Wrap(side) => {
                let x = match side {
                    WrapSide::Left => g.margin_left,
                    WrapSide::Right => g.width - g.margin_right - w,
                };
                self.draw_image(&mut page, img, x, y, w, h);
                page.floats.push(Float {
                    side,
                    left: x,
                    right: x + w,
                    bottom: y - IMAGE_SPACING,
                });
            }
        }
        page.has_content = true;
        self.current = Some(page);
        Ok(())
    }

    fn add_table(&mut self, table: &Table) -> Result<(), BookError> {
        if table.columns == 0 {
            return Err(BookError::render("table", "a table needs at least one column"));
        }
        let g = self.geometry;
        let mut page = self.take_page();
        page.clear_floats();
        if page.has_content {
            page.cursor -= table.spacing_before;
        }

        let table_width = g.body_width() * (table.width_percent / 100.0).clamp(0.0, 1.0);
        let column_width = table_width / table.columns as f32;
        let x_start = g.margin_left + (g.body_width() - table_width) / 2.0;

        for row in table.rows() {
            let sizes: Vec<Option<(f32, f32)>> = row
                .iter()
                .map(|cell| {
                    cell.image.as_ref().map(|img| {
                        fit_box(
                            img.width(),
                            img.height(),
                            column_width - 2.0 * cell.padding,
                            page.body_height() - 2.0 * cell.padding,
                        )
                    })
                })
                .collect();
            let row_height = row
                .iter()
                .zip(&sizes)
                .map(|(cell, size)| size.map_or(0.0, |(_, h)| h) + 2.0 * cell.padding)
                .fold(0.0, f32::max);

            if page.cursor - row_height < page.bottom && page.has_content {
                page = self.turn_page(page);
            }
            let row_bottom = page.cursor - row_height;
            for (i, (cell, size)) in row.iter().zip(&sizes).enumerate() {
                let cx = x_start + i as f32 * column_width;
                if let Some(bg) = cell.background {
                    fill_rect(&mut page.content, cx, row_bottom, column_width, row_height, bg);
                }
                if let Some(border) = cell.border {
                    stroke_rect(&mut page.content, cx, row_bottom, column_width, row_height, border);
                }
                if let (Some(img), Some((w, h))) = (&cell.image, size) {
                    let ix = cx + (column_width - w) / 2.0;
                    let iy = page.cursor - cell.padding - h;
                    self.draw_image(&mut page, img, ix, iy, *w, *h);
                }
            }
            page.cursor = row_bottom;
            page.has_content = true;
        }

        self.current = Some(page);
        Ok(())
    }

    // ── Drawing ──────────────────────────────────────────────────────────

    fn show_line(&mut self, page: &mut PageState, x: f32, baseline: f32, line: &Line) {
        page.content.begin_text();
        page.content.next_line(x, baseline);
        for frag in &line.fragments {
            let (name, id) = self.font_resource(&frag.font);
            let (r, g, b) = frag.font.color.to_unit();
            page.content.set_fill_rgb(r, g, b);
            page.content.set_font(Name(name.as_bytes()), frag.font.size);
            page.content.show(Str(&encode_win_ansi(&frag.text)));
            page.fonts.insert(name, id);
        }
        page.content.end_text();
    }

    fn draw_image(&mut self, page: &mut PageState, img: &ImageElement, x: f32, y: f32, w: f32, h: f32) {
        let image = &img.image;
        let mask_id = match image.alpha_data() {
            Some(alpha) => {
                let id = self.alloc();
                let mut mask = self.pdf.image_xobject(id, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(image.pixel_width() as i32);
                mask.height(image.pixel_height() as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(id)
            }
            None => None,
        };

        let id = self.alloc();
        {
            let mut xobj = self.pdf.image_xobject(id, image.rgb_data());
            xobj.filter(Filter::FlateDecode);
            xobj.width(image.pixel_width() as i32);
            xobj.height(image.pixel_height() as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_id) = mask_id {
                xobj.s_mask(mask_id);
            }
        }
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        page.content.save_state();
        page.content.transform([w, 0.0, 0.0, h, x, y]);
        page.content.x_object(Name(name.as_bytes()));
        page.content.restore_state();
        if let Some(border) = img.border {
            stroke_rect(&mut page.content, x, y, w, h, border);
        }
        page.x_objects.insert(name, id);
        debug!(
            "Placed {} at ({:.0}, {:.0}) size {:.0}×{:.0}",
            image.source().display(),
            x,
            y,
            w,
            h
        );
    }

    fn draw_band(&mut self, page: &mut PageState, band: &Band, y: f32) {
        let g = self.geometry;
        let height = band.height();
        fill_rect(&mut page.content, g.margin_left, y, g.body_width(), height, band.background);

        let text = band.text_for(page.number);
        let mut breaker = LineBreaker::new([(text.as_str(), band.font)]);
        if let Some(line) = breaker.next_line(g.body_width()) {
            let x = match band.alignment {
                Alignment::Left => g.margin_left,
                Alignment::Center => g.margin_left + (g.body_width() - line.width) / 2.0,
                Alignment::Right => g.width - g.margin_right - line.width,
            };
            let baseline = y + BAND_PADDING + band.font.size * 0.4;
            self.show_line(page, x, baseline, &line);
        }
    }

    // ── Pages ────────────────────────────────────────────────────────────

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn font_resource(&mut self, font: &FontSpec) -> (String, Ref) {
        let base = font.base_font_name();
        if let Some((name, id)) = self.fonts.get(base) {
            return (name.clone(), *id);
        }
        let id = self.alloc();
        let name = format!("F{}", self.fonts.len() + 1);
        self.fonts.insert(base, (name.clone(), id));
        (name, id)
    }

    fn take_page(&mut self) -> PageState {
        match self.current.take() {
            Some(page) => page,
            None => self.start_page(),
        }
    }

    fn turn_page(&mut self, page: PageState) -> PageState {
        self.finish_page(page);
        self.start_page()
    }

    fn start_page(&mut self) -> PageState {
        let g = self.geometry;
        let number = self.next_page_number;
        self.next_page_number += 1;
        let mut page = PageState {
            id: self.alloc(),
            content_id: self.alloc(),
            number,
            content: Content::new(),
            top: g.height - g.margin_top,
            bottom: g.margin_bottom,
            cursor: 0.0,
            has_content: false,
            floats: Vec::new(),
            fonts: BTreeMap::new(),
            x_objects: BTreeMap::new(),
        };

        if !self.background.is_white() {
            fill_rect(&mut page.content, 0.0, 0.0, g.width, g.height, self.background);
        }
        if let Some(header) = self.header.clone() {
            page.top -= header.height();
            let top = page.top;
            self.draw_band(&mut page, &header, top);
            rule(&mut page.content, g.margin_left, g.body_width(), page.top);
        }
        if let Some(footer) = self.footer.clone() {
            let bottom = page.bottom;
            self.draw_band(&mut page, &footer, bottom);
            page.bottom += footer.height();
            rule(&mut page.content, g.margin_left, g.body_width(), page.bottom);
        }
        page.cursor = page.top;
        page
    }

    fn finish_page(&mut self, page: PageState) {
        let raw = page.content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);
        self.pdf
            .stream(page.content_id, &compressed)
            .filter(Filter::FlateDecode);
        self.finished.push(FinishedPage {
            id: page.id,
            content_id: page.content_id,
            fonts: page.fonts,
            x_objects: page.x_objects,
        });
        debug!(
            "Finished page {} ({} physical)",
            page.number,
            self.finished.len()
        );
    }

    /// Write the object graph and hand the bytes to the sink.
    ///
    /// An open page with content is finished first. A document with no
    /// pages at all still gets one blank page so the output is valid.
    ///
    /// # Errors
    /// [`BookError::Render`] when the sink cannot be written or flushed.
    pub fn close(mut self) -> Result<W, BookError> {
        if let Some(page) = self.current.take() {
            if page.has_content || self.finished.is_empty() {
                self.finish_page(page);
            }
        }
        if self.finished.is_empty() {
            let page = self.start_page();
            self.finish_page(page);
        }

        for (base, (_, id)) in &self.fonts {
            self.pdf
                .type1_font(*id)
                .base_font(Name(base.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        let g = self.geometry;
        for p in &self.finished {
            let mut page = self.pdf.page(p.id);
            page.media_box(Rect::new(0.0, 0.0, g.width, g.height))
                .parent(self.pages_id)
                .contents(p.content_id);
            let mut resources = page.resources();
            if !p.fonts.is_empty() {
                let mut fonts = resources.fonts();
                for (name, id) in &p.fonts {
                    fonts.pair(Name(name.as_bytes()), *id);
                }
            }
            if !p.x_objects.is_empty() {
                let mut x_objects = resources.x_objects();
                for (name, id) in &p.x_objects {
                    x_objects.pair(Name(name.as_bytes()), *id);
                }
            }
        }
        let page_ids: Vec<Ref> = self.finished.iter().map(|p| p.id).collect();
        self.pdf
            .pages(self.pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        let outline_id = self.write_outline();
        {
            let mut catalog = self.pdf.catalog(self.catalog_id);
            catalog.pages(self.pages_id);
            if let Some(outline_id) = outline_id {
                catalog.outlines(outline_id);
                catalog.page_mode(PageMode::UseOutlines);
            }
        }
        self.write_info();

        let pages = self.finished.len();
        let Document { mut sink, pdf, .. } = self;
        let bytes = pdf.finish();
        sink.write_all(&bytes)
            .and_then(|_| sink.flush())
            .map_err(|e| BookError::render("writing the document", e))?;
        debug!("Wrote {} bytes, {} pages", bytes.len(), pages);
        Ok(sink)
    }

    fn write_outline(&mut self) -> Option<Ref> {
        if self.outline.is_empty() {
            return None;
        }
        let outline_id = self.alloc();
        let item_ids: Vec<Ref> = (0..self.outline.len()).map(|_| self.alloc()).collect();
        let first = item_ids[0];
        let last = item_ids[item_ids.len() - 1];
        self.pdf
            .outline(outline_id)
            .first(first)
            .last(last)
            .count(item_ids.len() as i32);

        for (i, entry) in self.outline.iter().enumerate() {
            let mut item = self.pdf.outline_item(item_ids[i]);
            item.title(TextStr(&entry.title)).parent(outline_id);
            if i > 0 {
                item.prev(item_ids[i - 1]);
            }
            if let Some(next) = item_ids.get(i + 1) {
                item.next(*next);
            }
            item.dest().page(entry.page).xyz(0.0, entry.top, None);
        }
        Some(outline_id)
    }

    fn write_info(&mut self) {
        let id = self.alloc();
        let mut info = self.pdf.document_info(id);
        if let Some(title) = &self.info.title {
            info.title(TextStr(title));
        }
        if let Some(subject) = &self.info.subject {
            info.subject(TextStr(subject));
        }
        if let Some(creator) = &self.info.creator {
            info.creator(TextStr(creator));
        }
        if let Some(at) = self.info.creation_date {
            info.creation_date(
                Date::new(at.year().clamp(0, 9999) as u16)
                    .month(at.month() as u8)
                    .day(at.day() as u8)
                    .hour(at.hour() as u8)
                    .minute(at.minute() as u8)
                    .second(at.second() as u8),
            );
        }
        for (key, value) in &self.info.markers {
            info.pair(Name(key.as_bytes()), TextStr(value));
        }
    }
}

// ── Geometry helpers ─────────────────────────────────────────────────────

/// Scale `w × h` down (never up) to fit `max_w × max_h`.
fn fit_box(w: f32, h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if w <= 0.0 || h <= 0.0 {
        return (w.max(0.0), h.max(0.0));
    }
    let factor = (max_w / w).min(max_h / h).clamp(0.0, 1.0);
    (w * factor, h * factor)
}

fn fill_rect(content: &mut Content, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let (r, g, b) = color.to_unit();
    content.save_state();
    content.set_fill_rgb(r, g, b);
    content.rect(x, y, w, h);
    content.fill_nonzero();
    content.restore_state();
}

fn stroke_rect(content: &mut Content, x: f32, y: f32, w: f32, h: f32, border: Border) {
    let (r, g, b) = border.color.to_unit();
    content.save_state();
    content.set_line_width(border.width);
    content.set_stroke_rgb(r, g, b);
    content.rect(x, y, w, h);
    content.stroke();
    content.restore_state();
}

fn rule(content: &mut Content, x: f32, width: f32, y: f32) {
    content.save_state();
    content.set_line_width(0.5);
    content.move_to(x, y);
    content.line_to(x + width, y);
    content.stroke();
    content.restore_state();
}
