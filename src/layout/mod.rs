//! Layout strategies and the selector that picks one per post.
//!
//! A [`LayoutStrategy`] is a plain value; one stateless
//! [`render::ChapterRenderer`] interprets every variant. Selection depends
//! only on the number of images in the post and the configured
//! [`LayoutOptions`], so it is deterministic and side-effect free.

pub mod grid;
pub mod render;

use crate::config::LayoutOptions;
pub use crate::pdf::element::WrapSide;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a chapter places its images relative to the body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// Body text only.
    NoImage,
    /// First image floated against one margin, text flowing beside it.
    SingleWrap(WrapSide),
    /// First image centered above the body.
    CenteredTop,
    /// First image centered below the body.
    CenteredBottom,
    /// Up to `n` images centered above the body, the rest on later pages.
    LeadingImages(usize),
    /// Images in a grid of `columns` above the body.
    Grid(usize),
    /// First image wraps left, the others alternate sides after the body.
    AlternateWrap,
}

impl fmt::Display for LayoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutStrategy::NoImage => write!(f, "no-image"),
            LayoutStrategy::SingleWrap(WrapSide::Left) => write!(f, "wrap-left"),
            LayoutStrategy::SingleWrap(WrapSide::Right) => write!(f, "wrap-right"),
            LayoutStrategy::CenteredTop => write!(f, "centered-top"),
            LayoutStrategy::CenteredBottom => write!(f, "centered-bottom"),
            LayoutStrategy::LeadingImages(n) => write!(f, "leading-images({n})"),
            LayoutStrategy::Grid(c) => write!(f, "grid({c})"),
            LayoutStrategy::AlternateWrap => write!(f, "alternate-wrap"),
        }
    }
}

// ── Configured sub-strategies ────────────────────────────────────────────

/// Layout used for posts with exactly one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SingleImageLayout {
    #[default]
    WrapLeft,
    WrapRight,
    CenteredTop,
    CenteredBottom,
}

/// Layout used for posts with two or more images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiImageLayout {
    #[default]
    Grid,
    LeadingImages,
    AlternateWrap,
}

impl fmt::Display for SingleImageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SingleImageLayout::WrapLeft => "wrap-left",
            SingleImageLayout::WrapRight => "wrap-right",
            SingleImageLayout::CenteredTop => "centered-top",
            SingleImageLayout::CenteredBottom => "centered-bottom",
        })
    }
}

impl FromStr for SingleImageLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "wrap-left" | "left" => Ok(SingleImageLayout::WrapLeft),
            "wrap-right" | "right" => Ok(SingleImageLayout::WrapRight),
            "centered-top" | "top" => Ok(SingleImageLayout::CenteredTop),
            "centered-bottom" | "bottom" => Ok(SingleImageLayout::CenteredBottom),
            other => Err(format!("unknown single-image layout '{other}'")),
        }
    }
}

impl fmt::Display for MultiImageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MultiImageLayout::Grid => "grid",
            MultiImageLayout::LeadingImages => "leading",
            MultiImageLayout::AlternateWrap => "alternate",
        })
    }
}

impl FromStr for MultiImageLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "grid" => Ok(MultiImageLayout::Grid),
            "leading" | "leading-images" => Ok(MultiImageLayout::LeadingImages),
            "alternate" | "alternate-wrap" => Ok(MultiImageLayout::AlternateWrap),
            other => Err(format!("unknown multi-image layout '{other}'")),
        }
    }
}

// ── Selection ────────────────────────────────────────────────────────────

/// Maps a post's image count to a [`LayoutStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSelector {
    single: SingleImageLayout,
    multi: MultiImageLayout,
    images_per_row: usize,
    leading_images: usize,
}

impl LayoutSelector {
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            single: options.single_image,
            multi: options.multi_image,
            images_per_row: options.images_per_row.max(1),
            leading_images: options.leading_images,
        }
    }

    /// `0 → NoImage`, `1 → ` the single-image layout, `≥2 →` the
    /// multi-image layout.
    pub fn select(&self, image_count: usize) -> LayoutStrategy {
        match image_count {
            0 => LayoutStrategy::NoImage,
            1 => match self.single {
                SingleImageLayout::WrapLeft => LayoutStrategy::SingleWrap(WrapSide::Left),
                SingleImageLayout::WrapRight => LayoutStrategy::SingleWrap(WrapSide::Right),
                SingleImageLayout::CenteredTop => LayoutStrategy::CenteredTop,
                SingleImageLayout::CenteredBottom => LayoutStrategy::CenteredBottom,
            },
            _ => match self.multi {
                MultiImageLayout::Grid => LayoutStrategy::Grid(self.images_per_row),
                MultiImageLayout::LeadingImages => {
                    LayoutStrategy::LeadingImages(self.leading_images)
                }
                MultiImageLayout::AlternateWrap => LayoutStrategy::AlternateWrap,
            },
        }
    }
}

impl Default for LayoutSelector {
    fn default() -> Self {
        Self::new(&LayoutOptions::default())
    }
}
