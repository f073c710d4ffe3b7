//! Error types for the blogbook library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BookError`]: **fatal**. The document cannot be completed (the output
//!   file cannot be opened, a document primitive failed, the configuration is
//!   invalid). Returned as `Err(BookError)` from the `BookWriter::write*`
//!   entry points. The output stream is append-only, so there is no partial
//!   recovery: the whole write is aborted.
//!
//! * [`ElementError`]: **non-fatal**. A single element could not be rendered
//!   (an image file is missing, font metrics are unknown) but the chapter is
//!   still produced. Stored inside [`crate::output::ChapterSummary`] so
//!   callers can report what was dropped.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the blogbook library.
///
/// Element-level failures use [`ElementError`] and are stored in
/// [`crate::output::ChapterSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BookError {
    // ── Output errors ─────────────────────────────────────────────────────
    /// The output file could not be created.
    #[error("Failed to open output document '{path}': {source}")]
    OutputOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or finalising the output file failed.
    #[error("Failed to write output document '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// A document-writing primitive failed.
    #[error("Failed to add content to the document ({context})\nCause: {detail}")]
    Render { context: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or property validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookError {
    /// Shorthand for a [`BookError::Render`] with a context label.
    pub fn render(context: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        BookError::Render {
            context: context.into(),
            detail: detail.to_string(),
        }
    }
}

/// A non-fatal error for a single element of a chapter.
///
/// The renderer logs it, records it and carries on with the next element.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ElementError {
    /// An image could not be resolved to a readable local file.
    #[error("Image '{reference}' skipped: {detail}")]
    ResourceMissing { reference: String, detail: String },

    /// No glyph-width table exists for the font; line padding was skipped.
    #[error("No metrics for font '{font}'; line padding skipped")]
    MetricsUnavailable { font: String },
}
