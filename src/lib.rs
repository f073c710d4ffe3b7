//! # blogbook
//!
//! Lay blog posts out as a paginated, print-ready PDF book.
//!
//! ## Why this crate?
//!
//! A blog export is a stream of posts, each with a title, a date, some text,
//! a handful of photos and a comment thread. Turning that into something you
//! can hand to a printer needs more than a text dump: a title page, one
//! chapter per post starting on a fresh page, images placed so text never
//! runs underneath them, page numbers in a footer, and a page count that
//! binds cleanly. This crate does that layout directly on top of
//! [`pdf-writer`](https://docs.rs/pdf-writer), with no native dependencies.
//!
//! ## Pipeline Overview
//!
//! ```text
//! posts (in caller order)
//!  │
//!  ├─ 1. Title     title + date range on an unnumbered first page
//!  ├─ 2. Resolve   each image → local temp file (ImageResolver)
//!  ├─ 3. Select    image count → LayoutStrategy (LayoutSelector)
//!  ├─ 4. Render    one chapter per post (ChapterRenderer)
//!  │                ├─ wrap estimate   (metrics)
//!  │                └─ image grid      (ImageGridComposer)
//!  ├─ 5. Bind      trailing blank pages for an even page count
//!  └─ 6. Close     outline, document info, PDF bytes + WriteSummary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blogbook::{BlogFeed, BookWriter, DateRange, LocalImageResolver, WriterConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = BlogFeed::from_json(&std::fs::read_to_string("blog.json")?)?;
//!     let range = DateRange::spanning(&feed.posts).ok_or("empty feed")?;
//!     let writer = BookWriter::new(WriterConfig::default());
//!     let resolver = LocalImageResolver::new("images/");
//!     let summary = writer.write_to_file(&feed.title, range, &feed.posts, &resolver, "blog.pdf")?;
//!     eprintln!("{} chapters, {} pages", summary.chapters.len(), summary.physical_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `blog2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! blogbook = { version = "0.5", default-features = false }
//! ```
//!
//! ## Layouts
//!
//! | Images | Strategy | Configured by |
//! |--------|----------|---------------|
//! | 0      | body text only | always |
//! | 1      | wrap left / wrap right / centered top / centered bottom | `LayoutOptions::single_image` |
//! | ≥ 2    | grid / leading images / alternate wrap | `LayoutOptions::multi_image` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod output;
pub mod pdf;
pub mod progress;
pub mod resolve;
pub mod style;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::BookWriter;
pub use config::{LayoutOptions, LayoutOptionsBuilder, PageGeometry, WriterConfig, WriterConfigBuilder};
pub use error::{BookError, ElementError};
pub use layout::render::ChapterRenderer;
pub use layout::{LayoutSelector, LayoutStrategy, MultiImageLayout, SingleImageLayout, WrapSide};
pub use metrics::estimate_line_count;
pub use model::{select_posts, BlogFeed, Comment, DateRange, ImageRef, Post, PostEntry, PostOrder};
pub use output::{ChapterSummary, WriteSummary};
pub use progress::{ChannelStatusSink, NoopStatusSink, SharedStatusSink, StatusEvent, StatusSink};
pub use resolve::{
    FeedImageResolver, HttpImageResolver, ImageResolver, LocalImageResolver, ResolvedImage,
};
pub use style::{Color, ColorSet, FontFamily, FontSet, FontSpec, FontStyle, StyleRegistry};
