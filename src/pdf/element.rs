//! Content elements appended to a [`Document`](super::Document).
//!
//! Elements are plain values: they describe what to draw and the document
//! decides where it lands.

use super::image::PdfImage;
use crate::style::{Color, FontSpec};

/// Horizontal alignment of a paragraph's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

// ── Text ─────────────────────────────────────────────────────────────────

/// A run of text in one font. `'\n'` inside the text ends a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub font: FontSpec,
}

impl Chunk {
    pub fn new(text: impl Into<String>, font: FontSpec) -> Self {
        Self {
            text: text.into(),
            font,
        }
    }

    /// A line break whose height follows `font`.
    pub fn newline(font: FontSpec) -> Self {
        Self::new("\n", font)
    }
}

/// A block of chunks laid out as wrapped lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub chunks: Vec<Chunk>,
    pub alignment: Alignment,
    pub indent_left: f32,
    pub indent_right: f32,
    pub spacing_before: f32,
    pub spacing_after: f32,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, font: FontSpec) -> Self {
        let mut p = Self::empty();
        p.push(Chunk::new(text, font));
        p
    }

    /// A paragraph with no chunks yet.
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            alignment: Alignment::Left,
            indent_left: 0.0,
            indent_right: 0.0,
            spacing_before: 0.0,
            spacing_after: 0.0,
        }
    }

    /// One empty line in `font`.
    pub fn blank_line(font: FontSpec) -> Self {
        Self::new(" ", font)
    }

    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn indented(mut self, left: f32, right: f32) -> Self {
        self.indent_left = left;
        self.indent_right = right;
        self
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    /// Append `count` line breaks in `font`.
    pub fn push_blank_lines(&mut self, count: usize, font: FontSpec) {
        for _ in 0..count {
            self.push(Chunk::newline(font));
        }
    }

    /// Leading of the first chunk's font, or 18pt for an empty paragraph.
    pub fn leading(&self) -> f32 {
        self.chunks.first().map(|c| c.font.leading()).unwrap_or(18.0)
    }

    /// Concatenated text of every chunk.
    pub fn plain_text(&self) -> String {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}

// ── Images ───────────────────────────────────────────────────────────────

/// Which side of the text column a wrapped image sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WrapSide {
    Left,
    Right,
}

/// How an image takes part in the text flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// On its own line, horizontally centered.
    Centered,
    /// Floated against one margin; following text flows beside it.
    Wrap(WrapSide),
}

/// A stroke drawn around an image or cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

/// An image with its display size and placement.
#[derive(Debug, Clone)]
pub struct ImageElement {
    pub image: PdfImage,
    pub placement: Placement,
    pub scale: f32,
    pub border: Option<Border>,
}

impl ImageElement {
    pub fn new(image: PdfImage, placement: Placement) -> Self {
        Self {
            image,
            placement,
            scale: 1.0,
            border: None,
        }
    }

    pub fn with_border(mut self, border: Option<Border>) -> Self {
        self.border = border;
        self
    }

    pub fn width(&self) -> f32 {
        self.image.pixel_width() as f32 * self.scale
    }

    pub fn height(&self) -> f32 {
        self.image.pixel_height() as f32 * self.scale
    }

    /// Shrink so the image fits inside `max_width` × `max_height`. Never
    /// enlarges.
    pub fn fit_within(&mut self, max_width: f32, max_height: f32) {
        let w = self.width();
        let h = self.height();
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let factor = (max_width / w).min(max_height / h);
        if factor < 1.0 {
            self.scale *= factor.max(0.0);
        }
    }
}

// ── Tables ───────────────────────────────────────────────────────────────

/// One table cell. A cell without an image is blank.
#[derive(Debug, Clone)]
pub struct Cell {
    pub image: Option<ImageElement>,
    pub padding: f32,
    pub border: Option<Border>,
    pub background: Option<Color>,
}

impl Cell {
    pub fn image(image: ImageElement, padding: f32) -> Self {
        Self {
            image: Some(image),
            padding,
            border: None,
            background: None,
        }
    }

    pub fn blank(padding: f32) -> Self {
        Self {
            image: None,
            padding,
            border: None,
            background: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.is_none()
    }

    /// Height the cell needs: content plus padding top and bottom.
    pub fn content_height(&self) -> f32 {
        self.image.as_ref().map(|i| i.height()).unwrap_or(0.0) + 2.0 * self.padding
    }
}

/// A table of equal-width columns filled row by row.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: usize,
    /// Share of the body width the table occupies, centered.
    pub width_percent: f32,
    pub spacing_before: f32,
    pub cells: Vec<Cell>,
}

impl Table {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            width_percent: 80.0,
            spacing_before: 0.0,
            cells: Vec::new(),
        }
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Cells grouped into rows; the last row may be short.
    pub fn rows(&self) -> Vec<&[Cell]> {
        if self.columns == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.columns).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }
}

// ── Composition ──────────────────────────────────────────────────────────

/// Anything that can be appended to a document or chapter.
#[derive(Debug, Clone)]
pub enum Element {
    Paragraph(Paragraph),
    Image(ImageElement),
    Table(Table),
    /// Start a new page unless the current one is still empty.
    PageBreak,
}

impl From<Paragraph> for Element {
    fn from(p: Paragraph) -> Self {
        Element::Paragraph(p)
    }
}

impl From<ImageElement> for Element {
    fn from(i: ImageElement) -> Self {
        Element::Image(i)
    }
}

impl From<Table> for Element {
    fn from(t: Table) -> Self {
        Element::Table(t)
    }
}

/// A numbered section that starts on a new page and gets a bookmark.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub number: u32,
    pub title: Paragraph,
    pub elements: Vec<Element>,
}

impl Chapter {
    pub fn new(number: u32, title: Paragraph) -> Self {
        Self {
            number,
            title,
            elements: Vec::new(),
        }
    }

    pub fn add(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    pub fn bookmark_title(&self) -> String {
        self.title.plain_text().trim().to_string()
    }
}
