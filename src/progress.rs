//! Status reporting for a document write.
//!
//! Inject an [`Arc<dyn StatusSink>`] via
//! [`crate::config::WriterConfigBuilder::status_sink`] to receive coarse
//! checkpoints (title page, content, each post, completion) while a document
//! is written.
//!
//! Delivery is best-effort. A sink cannot fail the write: `on_status`
//! returns nothing, and [`ChannelStatusSink`] silently drops events once the
//! receiver is gone. Events are delivered in emission order because the
//! writer is strictly sequential.
//!
//! # Example
//!
//! ```rust
//! use blogbook::{StatusEvent, StatusSink, WriterConfig};
//! use std::sync::{Arc, Mutex};
//!
//! struct Collect(Mutex<Vec<String>>);
//!
//! impl StatusSink for Collect {
//!     fn on_status(&self, event: &StatusEvent) {
//!         self.0.lock().unwrap().push(event.to_string());
//!     }
//! }
//!
//! let sink = Arc::new(Collect(Mutex::new(Vec::new())));
//! let config = WriterConfig::builder()
//!     .status_sink(sink.clone() as Arc<dyn StatusSink>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A checkpoint reached by the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEvent {
    TitlePage,
    Content {
        total_posts: usize,
    },
    DownloadingImages {
        chapter: u32,
        images: usize,
    },
    WritingPost {
        chapter: u32,
        title: String,
    },
    Completing,
    Complete,
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::TitlePage => write!(f, "Writing title page"),
            StatusEvent::Content { .. } => write!(f, "Writing content"),
            StatusEvent::DownloadingImages { .. } => write!(f, "Downloading images for post"),
            StatusEvent::WritingPost { .. } => write!(f, "Writing post"),
            StatusEvent::Completing => write!(f, "Completing doc"),
            StatusEvent::Complete => write!(f, "Successfully wrote pdf"),
        }
    }
}

/// Receives status events from the writer.
///
/// Implementations must be `Send + Sync` so one sink can observe several
/// independent writes.
pub trait StatusSink: Send + Sync {
    fn on_status(&self, event: &StatusEvent);
}

/// Discards every event. This is the default when no sink is configured.
pub struct NoopStatusSink;

impl StatusSink for NoopStatusSink {
    fn on_status(&self, _event: &StatusEvent) {}
}

/// Forwards events to an `mpsc` channel.
///
/// A disconnected receiver is not an error; the event is dropped.
pub struct ChannelStatusSink {
    sender: Mutex<Sender<StatusEvent>>,
}

impl ChannelStatusSink {
    pub fn new(sender: Sender<StatusEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl StatusSink for ChannelStatusSink {
    fn on_status(&self, event: &StatusEvent) {
        let Ok(sender) = self.sender.lock() else {
            return;
        };
        if sender.send(event.clone()).is_err() {
            debug!("Status receiver gone; dropped '{}'", event);
        }
    }
}

/// Convenience alias matching the type stored in [`crate::config::WriterConfig`].
pub type SharedStatusSink = Arc<dyn StatusSink>;
