//! Configuration types for writing a blog book.
//!
//! All writer behaviour is controlled through [`WriterConfig`], built via its
//! [`WriterConfigBuilder`]. Layout knobs live in the immutable
//! [`LayoutOptions`] value so the same options can be shared across
//! concurrent, independent document writes.

use crate::error::BookError;
use crate::layout::{MultiImageLayout, SingleImageLayout};
use crate::progress::SharedStatusSink;
use crate::style::StyleRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ── Page geometry ────────────────────────────────────────────────────────

/// Page size and margins in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    /// ISO A4 with 36pt (half inch) margins.
    pub const A4: PageGeometry = PageGeometry {
        width: 595.0,
        height: 842.0,
        margin_left: 36.0,
        margin_right: 36.0,
        margin_top: 36.0,
        margin_bottom: 36.0,
    };

    /// US Letter with 36pt margins.
    pub const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin_left: 36.0,
        margin_right: 36.0,
        margin_top: 36.0,
        margin_bottom: 36.0,
    };

    /// Width between the left and right margins.
    pub fn body_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Height between the top and bottom margins.
    pub fn body_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }

    fn validate(&self) -> Result<(), BookError> {
        let values = [
            self.width,
            self.height,
            self.margin_left,
            self.margin_right,
            self.margin_top,
            self.margin_bottom,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(BookError::InvalidConfig(
                "Page dimensions and margins must be finite and non-negative".into(),
            ));
        }
        if self.body_width() < 72.0 || self.body_height() < 144.0 {
            return Err(BookError::InvalidConfig(format!(
                "Margins leave too little room: body is {:.0}×{:.0}pt",
                self.body_width(),
                self.body_height()
            )));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

// ── Layout options ───────────────────────────────────────────────────────

/// Property key: images per grid row.
pub const PROP_IMAGES_PER_ROW: &str = "Images Per Row";
/// Property key: images shown above the body in the leading-images layout.
pub const PROP_LEADING_IMAGES: &str = "Max Leading Images";
/// Property key: draw a border around images.
pub const PROP_IMAGE_BORDER: &str = "Use Image Border";
/// Property key: border width in points.
pub const PROP_IMAGE_BORDER_WIDTH: &str = "Image Border Width";
/// Property key: paint grid cells with the image background color.
pub const PROP_IMAGE_BACKGROUND: &str = "Use Image Background";
/// Property key: layout for posts with one image.
pub const PROP_SINGLE_IMAGE_LAYOUT: &str = "Single Image Layout";
/// Property key: layout for posts with several images.
pub const PROP_MULTI_IMAGE_LAYOUT: &str = "Multi Image Layout";

/// Immutable per-render layout options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Layout for posts with exactly one image. Default: wrap text, image left.
    pub single_image: SingleImageLayout,
    /// Layout for posts with two or more images. Default: grid on top.
    pub multi_image: MultiImageLayout,
    /// Grid columns. Default: 2.
    pub images_per_row: usize,
    /// Images shown above the body in the leading-images layout. Default: 1.
    pub leading_images: usize,
    /// Draw a border around every image. Default: false.
    pub image_border: bool,
    /// Border width in points. Default: 10.
    pub image_border_width: f32,
    /// Paint grid cells with the image background color. Default: false.
    pub use_image_background: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            single_image: SingleImageLayout::default(),
            multi_image: MultiImageLayout::default(),
            images_per_row: 2,
            leading_images: 1,
            image_border: false,
            image_border_width: 10.0,
            use_image_background: false,
        }
    }
}

impl LayoutOptions {
    pub fn builder() -> LayoutOptionsBuilder {
        LayoutOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Current values under their property names.
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        vec![
            (PROP_IMAGES_PER_ROW, self.images_per_row.to_string()),
            (PROP_LEADING_IMAGES, self.leading_images.to_string()),
            (PROP_IMAGE_BORDER, self.image_border.to_string()),
            (PROP_IMAGE_BORDER_WIDTH, self.image_border_width.to_string()),
            (PROP_IMAGE_BACKGROUND, self.use_image_background.to_string()),
            (PROP_SINGLE_IMAGE_LAYOUT, self.single_image.to_string()),
            (PROP_MULTI_IMAGE_LAYOUT, self.multi_image.to_string()),
        ]
    }
}

/// Builder for [`LayoutOptions`].
#[derive(Debug, Clone)]
pub struct LayoutOptionsBuilder {
    options: LayoutOptions,
}

impl LayoutOptionsBuilder {
    pub fn single_image(mut self, layout: SingleImageLayout) -> Self {
        self.options.single_image = layout;
        self
    }

    pub fn multi_image(mut self, layout: MultiImageLayout) -> Self {
        self.options.multi_image = layout;
        self
    }

    pub fn images_per_row(mut self, n: usize) -> Self {
        self.options.images_per_row = n.max(1);
        self
    }

    pub fn leading_images(mut self, n: usize) -> Self {
        self.options.leading_images = n;
        self
    }

    pub fn image_border(mut self, enabled: bool) -> Self {
        self.options.image_border = enabled;
        self
    }

    pub fn image_border_width(mut self, width: f32) -> Self {
        self.options.image_border_width = width.max(0.0);
        self
    }

    pub fn use_image_background(mut self, enabled: bool) -> Self {
        self.options.use_image_background = enabled;
        self
    }

    /// Apply a `key = value` property.
    ///
    /// Boolean properties accept `true/yes/on/1` (anything else is false).
    /// Numeric and layout properties that fail to parse return
    /// [`BookError::InvalidConfig`] and keep the previous value.
    pub fn apply_property(&mut self, key: &str, value: &str) -> Result<(), BookError> {
        let value = value.trim();
        let invalid = |what: &str| {
            BookError::InvalidConfig(format!("'{key}' expects {what}, got '{value}'"))
        };
        match key.trim() {
            PROP_IMAGES_PER_ROW => {
                let n: usize = value.parse().map_err(|_| invalid("a positive integer"))?;
                if n == 0 {
                    return Err(invalid("a positive integer"));
                }
                self.options.images_per_row = n;
            }
            PROP_LEADING_IMAGES => {
                self.options.leading_images =
                    value.parse().map_err(|_| invalid("a non-negative integer"))?;
            }
            PROP_IMAGE_BORDER => self.options.image_border = parse_flag(value),
            PROP_IMAGE_BORDER_WIDTH => {
                let w: f32 = value.parse().map_err(|_| invalid("a number"))?;
                if !w.is_finite() || w < 0.0 {
                    return Err(invalid("a non-negative number"));
                }
                self.options.image_border_width = w;
            }
            PROP_IMAGE_BACKGROUND => self.options.use_image_background = parse_flag(value),
            PROP_SINGLE_IMAGE_LAYOUT => {
                self.options.single_image = value
                    .parse()
                    .map_err(|_| invalid("wrap-left, wrap-right, centered-top or centered-bottom"))?;
            }
            PROP_MULTI_IMAGE_LAYOUT => {
                self.options.multi_image = value
                    .parse()
                    .map_err(|_| invalid("grid, leading or alternate"))?;
            }
            other => {
                return Err(BookError::InvalidConfig(format!(
                    "Unknown layout property '{other}'"
                )))
            }
        }
        Ok(())
    }

    pub fn build(self) -> LayoutOptions {
        self.options
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

// ── Writer config ────────────────────────────────────────────────────────

/// Configuration for writing a blog book.
///
/// Built via [`WriterConfig::builder()`] or using [`WriterConfig::default()`].
///
/// # Example
/// ```rust
/// use blogbook::{LayoutOptions, WriterConfig};
///
/// let config = WriterConfig::builder()
///     .include_comments(false)
///     .layout(LayoutOptions::builder().images_per_row(3).build())
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.images_per_row, 3);
/// ```
#[derive(Clone)]
pub struct WriterConfig {
    /// Page size and margins. Default: A4, 36pt margins.
    pub geometry: PageGeometry,

    /// Render each post's comments after its body. Default: true.
    pub include_comments: bool,

    /// Pad the end of the book with blank pages for print binding. Default: true.
    ///
    /// The padding always leaves an even number of content pages followed by
    /// a blank front/back sheet.
    pub trailing_blank: bool,

    /// `chrono` format for the title-page date range. Default: `%B %d, %Y`.
    pub title_date_format: String,

    /// `chrono` format for each chapter's posting date. Default: `%A, %B %d, %Y`.
    pub posting_date_format: String,

    /// Shared font/color registry.
    pub styles: Arc<StyleRegistry>,

    /// Layout selection and image options.
    pub layout: LayoutOptions,

    /// Optional status sink; `None` means events are discarded.
    pub status_sink: Option<SharedStatusSink>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            include_comments: true,
            trailing_blank: true,
            title_date_format: "%B %d, %Y".to_string(),
            posting_date_format: "%A, %B %d, %Y".to_string(),
            styles: Arc::new(StyleRegistry::default()),
            layout: LayoutOptions::default(),
            status_sink: None,
        }
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("geometry", &self.geometry)
            .field("include_comments", &self.include_comments)
            .field("trailing_blank", &self.trailing_blank)
            .field("title_date_format", &self.title_date_format)
            .field("posting_date_format", &self.posting_date_format)
            .field("layout", &self.layout)
            .field("status_sink", &self.status_sink.as_ref().map(|_| "<dyn StatusSink>"))
            .finish()
    }
}

impl WriterConfig {
    /// Create a new builder for `WriterConfig`.
    pub fn builder() -> WriterConfigBuilder {
        WriterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WriterConfig`].
#[derive(Debug)]
pub struct WriterConfigBuilder {
    config: WriterConfig,
}

impl WriterConfigBuilder {
    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn include_comments(mut self, v: bool) -> Self {
        self.config.include_comments = v;
        self
    }

    pub fn trailing_blank(mut self, v: bool) -> Self {
        self.config.trailing_blank = v;
        self
    }

    pub fn title_date_format(mut self, fmt: impl Into<String>) -> Self {
        self.config.title_date_format = fmt.into();
        self
    }

    pub fn posting_date_format(mut self, fmt: impl Into<String>) -> Self {
        self.config.posting_date_format = fmt.into();
        self
    }

    pub fn styles(mut self, styles: Arc<StyleRegistry>) -> Self {
        self.config.styles = styles;
        self
    }

    pub fn layout(mut self, layout: LayoutOptions) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn status_sink(mut self, sink: SharedStatusSink) -> Self {
        self.config.status_sink = Some(sink);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WriterConfig, BookError> {
        let c = &self.config;
        c.geometry.validate()?;
        if c.layout.images_per_row == 0 {
            return Err(BookError::InvalidConfig("Images per row must be ≥ 1".into()));
        }
        for (name, fmt) in [
            ("title date format", &c.title_date_format),
            ("posting date format", &c.posting_date_format),
        ] {
            if fmt.trim().is_empty() {
                return Err(BookError::InvalidConfig(format!("The {name} is empty")));
            }
            if chrono::format::StrftimeItems::new(fmt).any(|i| i == chrono::format::Item::Error) {
                return Err(BookError::InvalidConfig(format!(
                    "The {name} '{fmt}' is not a valid strftime pattern"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = WriterConfig::default();
        assert!(c.include_comments);
        assert!(c.trailing_blank);
        assert_eq!(c.layout.images_per_row, 2);
        assert_eq!(c.layout.leading_images, 1);
        assert_eq!(c.layout.single_image, SingleImageLayout::WrapLeft);
        assert_eq!(c.layout.multi_image, MultiImageLayout::Grid);
        assert_eq!(c.geometry, PageGeometry::A4);
    }

    #[test]
    fn invalid_numeric_property_keeps_prior_value() {
        let mut b = LayoutOptions::builder().images_per_row(3);
        let err = b.apply_property(PROP_IMAGES_PER_ROW, "three").unwrap_err();
        assert!(matches!(err, BookError::InvalidConfig(_)));
        assert_eq!(b.build().images_per_row, 3);
    }

    #[test]
    fn zero_images_per_row_is_rejected() {
        let mut b = LayoutOptions::builder();
        assert!(b.apply_property(PROP_IMAGES_PER_ROW, "0").is_err());
        assert_eq!(b.build().images_per_row, 2);
    }

    #[test]
    fn properties_apply() {
        let mut b = LayoutOptions::builder();
        b.apply_property(PROP_IMAGES_PER_ROW, " 4 ").unwrap();
        b.apply_property(PROP_LEADING_IMAGES, "2").unwrap();
        b.apply_property(PROP_IMAGE_BORDER, "yes").unwrap();
        b.apply_property(PROP_IMAGE_BORDER_WIDTH, "2.5").unwrap();
        b.apply_property(PROP_SINGLE_IMAGE_LAYOUT, "wrap-right").unwrap();
        b.apply_property(PROP_MULTI_IMAGE_LAYOUT, "alternate").unwrap();
        let o = b.build();
        assert_eq!(o.images_per_row, 4);
        assert_eq!(o.leading_images, 2);
        assert!(o.image_border);
        assert_eq!(o.image_border_width, 2.5);
        assert_eq!(o.single_image, SingleImageLayout::WrapRight);
        assert_eq!(o.multi_image, MultiImageLayout::AlternateWrap);
    }

    #[test]
    fn unknown_property_is_rejected() {
        let mut b = LayoutOptions::builder();
        assert!(b.apply_property("Colour", "red").is_err());
    }

    #[test]
    fn properties_round_trip() {
        let original = LayoutOptions::builder()
            .images_per_row(3)
            .multi_image(MultiImageLayout::LeadingImages)
            .image_border(true)
            .build();
        let mut b = LayoutOptions::builder();
        for (k, v) in original.properties() {
            b.apply_property(k, &v).unwrap();
        }
        assert_eq!(b.build(), original);
    }

    #[test]
    fn rejects_oversized_margins() {
        let geometry = PageGeometry {
            margin_left: 300.0,
            margin_right: 300.0,
            ..PageGeometry::A4
        };
        let err = WriterConfig::builder().geometry(geometry).build().unwrap_err();
        assert!(matches!(err, BookError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_bad_date_format() {
        assert!(WriterConfig::builder()
            .posting_date_format("%Q")
            .build()
            .is_err());
    }

    #[test]
    fn body_dimensions() {
        assert_eq!(PageGeometry::A4.body_width(), 523.0);
        assert_eq!(PageGeometry::A4.body_height(), 770.0);
    }
}
