//! Font and color registry shared by every chapter renderer.
//!
//! The registry is built once (usually via [`StyleRegistry::default`]) and
//! then only ever read. It is `Send + Sync` and is handed to the writer as an
//! `Arc`, so several independent documents can be rendered against the same
//! registry at the same time.

use serde::{Deserialize, Serialize};

// ── Colors ───────────────────────────────────────────────────────────────

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const LIGHT_GRAY: Color = Color::rgb(192, 192, 192);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as `0.0..=1.0` floats, the form PDF color operators take.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    pub fn is_white(self) -> bool {
        self == Color::WHITE
    }
}

// ── Fonts ────────────────────────────────────────────────────────────────

/// The standard PDF font families. None of them needs embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    Helvetica,
    TimesRoman,
    Courier,
}

impl FontFamily {
    /// Every family the writer can render, sorted by name.
    pub fn all() -> &'static [FontFamily] {
        &[FontFamily::Courier, FontFamily::Helvetica, FontFamily::TimesRoman]
    }

    pub fn name(self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::TimesRoman => "Times-Roman",
            FontFamily::Courier => "Courier",
        }
    }
}

/// Weight/slant combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

/// A fully specified font: family, size in points, style and color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f32,
    #[serde(default)]
    pub style: FontStyle,
    pub color: Color,
}

impl FontSpec {
    pub const fn new(family: FontFamily, size: f32, style: FontStyle, color: Color) -> Self {
        Self {
            family,
            size,
            style,
            color,
        }
    }

    /// Default paragraph leading: one and a half times the font size.
    pub fn leading(&self) -> f32 {
        self.size * 1.5
    }

    /// PostScript name of the standard font face.
    pub fn base_font_name(&self) -> &'static str {
        use FontFamily::*;
        use FontStyle::*;
        match (self.family, self.style) {
            (Helvetica, Normal) => "Helvetica",
            (Helvetica, Bold) => "Helvetica-Bold",
            (Helvetica, Italic) => "Helvetica-Oblique",
            (Helvetica, BoldItalic) => "Helvetica-BoldOblique",
            (TimesRoman, Normal) => "Times-Roman",
            (TimesRoman, Bold) => "Times-Bold",
            (TimesRoman, Italic) => "Times-Italic",
            (TimesRoman, BoldItalic) => "Times-BoldItalic",
            (Courier, Normal) => "Courier",
            (Courier, Bold) => "Courier-Bold",
            (Courier, Italic) => "Courier-Oblique",
            (Courier, BoldItalic) => "Courier-BoldOblique",
        }
    }

    /// Human-readable style, e.g. `"Bold | Italics"`.
    pub fn style_label(&self) -> String {
        let mut parts = Vec::new();
        if self.style.is_bold() {
            parts.push("Bold");
        }
        if self.style.is_italic() {
            parts.push("Italics");
        }
        parts.join(" | ")
    }
}

// ── Registry ─────────────────────────────────────────────────────────────

/// Named fonts used by the title page, chapters and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSet {
    pub document_title: FontSpec,
    pub document_author: FontSpec,
    pub document_date: FontSpec,
    pub content_title: FontSpec,
    pub posting_date: FontSpec,
    pub content: FontSpec,
    pub comment_title: FontSpec,
    pub comment: FontSpec,
}

/// Named colors used for backgrounds, borders and bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSet {
    pub document_background: Color,
    pub header_footer_background: Color,
    pub image_background: Color,
    pub image_border: Color,
    pub title_page_font: Color,
    pub content_title_font: Color,
    pub content_font: Color,
}

impl Default for ColorSet {
    fn default() -> Self {
        Self {
            document_background: Color::WHITE,
            header_footer_background: Color::WHITE,
            image_background: Color::BLACK,
            image_border: Color::LIGHT_GRAY,
            title_page_font: Color::BLACK,
            content_title_font: Color::BLACK,
            content_font: Color::BLACK,
        }
    }
}

/// Immutable font/color registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRegistry {
    pub fonts: FontSet,
    pub colors: ColorSet,
}

impl StyleRegistry {
    /// Build the standard font table in `family` against the given colors.
    pub fn with_family(family: FontFamily, colors: ColorSet) -> Self {
        let font = |size: f32, style: FontStyle, color: Color| FontSpec::new(family, size, style, color);
        let fonts = FontSet {
            document_title: font(30.0, FontStyle::Bold, colors.title_page_font),
            document_author: font(20.0, FontStyle::BoldItalic, colors.title_page_font),
            document_date: font(14.0, FontStyle::Bold, colors.title_page_font),
            content_title: font(20.0, FontStyle::BoldItalic, colors.content_title_font),
            posting_date: font(10.0, FontStyle::Bold, colors.content_font),
            content: font(12.0, FontStyle::Normal, colors.content_font),
            comment_title: font(10.0, FontStyle::Bold, colors.content_font),
            comment: font(8.0, FontStyle::Normal, colors.content_font),
        };
        Self { fonts, colors }
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::with_family(FontFamily::Helvetica, ColorSet::default())
    }
}
