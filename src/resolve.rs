//! Image resolution: turn a post's image references into local files.
//!
//! ## Why copy into a temp directory?
//!
//! The renderer needs a file-system path it can decode, and the assembler
//! releases every image file once its post is written. Materialising each
//! image under a `TempDir` gives both: the path exists for exactly as long
//! as the [`ResolvedImage`] lives, and cleanup happens on drop even if the
//! chapter fails. Originals referenced by local path are never deleted.
//!
//! Resolution never fails the write. A reference that cannot be fetched
//! becomes [`ResolvedImage::Unresolved`] and is skipped by the renderer.

use crate::error::{BookError, ElementError};
use crate::model::{ImageRef, Post};
use crate::pdf::image::PdfImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// A post image after resolution.
#[derive(Debug)]
pub enum ResolvedImage {
    /// Used in place; the file is not owned.
    Local { source: String, path: PathBuf },
    /// Copied or downloaded into a temp directory that is removed on drop.
    Temporary {
        source: String,
        path: PathBuf,
        _temp_dir: TempDir,
    },
    /// Could not be made available locally.
    Unresolved { source: String, detail: String },
}

impl ResolvedImage {
    pub fn source(&self) -> &str {
        match self {
            ResolvedImage::Local { source, .. }
            | ResolvedImage::Temporary { source, .. }
            | ResolvedImage::Unresolved { source, .. } => source,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedImage::Local { path, .. } | ResolvedImage::Temporary { path, .. } => Some(path),
            ResolvedImage::Unresolved { .. } => None,
        }
    }

    /// Decode the local file.
    ///
    /// # Errors
    /// [`ElementError::ResourceMissing`] when the image was not resolved,
    /// the file is gone or it cannot be decoded.
    pub fn load(&self) -> Result<PdfImage, ElementError> {
        match self {
            ResolvedImage::Unresolved { source, detail } => Err(ElementError::ResourceMissing {
                reference: source.clone(),
                detail: detail.clone(),
            }),
            ResolvedImage::Local { source, path } | ResolvedImage::Temporary { source, path, .. } => {
                PdfImage::load(path).map_err(|e| match e {
                    ElementError::ResourceMissing { detail, .. } => ElementError::ResourceMissing {
                        reference: source.clone(),
                        detail,
                    },
                    other => other,
                })
            }
        }
    }
}

/// Makes post images available as local files.
///
/// Called once per image, synchronously, right before the post is rendered.
pub trait ImageResolver {
    fn resolve(&self, post: &Post, image: &ImageRef) -> ResolvedImage;
}

/// Check if the image source looks like a URL.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

// ── Local files ──────────────────────────────────────────────────────────

/// Resolves paths (absolute, `file://` or relative to `base_dir`) by
/// copying the file into a temp directory as `{post_id}-{name}`.
#[derive(Debug, Clone)]
pub struct LocalImageResolver {
    base_dir: PathBuf,
}

impl LocalImageResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn locate(&self, source: &str) -> PathBuf {
        let trimmed = source.strip_prefix("file://").unwrap_or(source);
        let path = Path::new(trimmed);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ImageResolver for LocalImageResolver {
    fn resolve(&self, post: &Post, image: &ImageRef) -> ResolvedImage {
        let original = self.locate(&image.source);
        if !original.is_file() {
            warn!("Image {} not found at {}", image.source, original.display());
            return ResolvedImage::Unresolved {
                source: image.source.clone(),
                detail: format!("file not found: {}", original.display()),
            };
        }

        let copied = TempDir::new().and_then(|dir| {
            let path = dir.path().join(image.file_name(post.id()));
            std::fs::copy(&original, &path).map(|_| (dir, path))
        });
        match copied {
            Ok((dir, path)) => {
                debug!("Copied {} to {}", original.display(), path.display());
                ResolvedImage::Temporary {
                    source: image.source.clone(),
                    path,
                    _temp_dir: dir,
                }
            }
            Err(e) => {
                // The source file is still readable in place.
                debug!("Copy of {} failed ({}); using it in place", original.display(), e);
                ResolvedImage::Local {
                    source: image.source.clone(),
                    path: original,
                }
            }
        }
    }
}

// ── HTTP ─────────────────────────────────────────────────────────────────

/// Downloads `http(s)://` images with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpImageResolver {
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpImageResolver {
    /// # Errors
    /// [`BookError::Internal`] when the HTTP client cannot be built.
    pub fn new(timeout_secs: u64) -> Result<Self, BookError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("blogbook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BookError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    fn download(&self, post: &Post, image: &ImageRef) -> Result<ResolvedImage, String> {
        info!("Downloading image {}", image.source);
        let response = self.client.get(&image.source).send().map_err(|e| {
            if e.is_timeout() {
                format!("timed out after {}s", self.timeout_secs)
            } else {
                e.to_string()
            }
        })?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        let bytes = response.bytes().map_err(|e| e.to_string())?;

        let temp_dir = TempDir::new().map_err(|e| format!("temp dir: {e}"))?;
        let path = temp_dir.path().join(image.file_name(post.id()));
        std::fs::write(&path, &bytes).map_err(|e| format!("write {}: {e}", path.display()))?;
        debug!("Downloaded {} bytes to {}", bytes.len(), path.display());
        Ok(ResolvedImage::Temporary {
            source: image.source.clone(),
            path,
            _temp_dir: temp_dir,
        })
    }
}

impl ImageResolver for HttpImageResolver {
    fn resolve(&self, post: &Post, image: &ImageRef) -> ResolvedImage {
        self.download(post, image).unwrap_or_else(|detail| {
            warn!("Image {} could not be downloaded: {}", image.source, detail);
            ResolvedImage::Unresolved {
                source: image.source.clone(),
                detail,
            }
        })
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────

/// Sends URLs to an [`HttpImageResolver`] and everything else to a
/// [`LocalImageResolver`].
#[derive(Debug, Clone)]
pub struct FeedImageResolver {
    local: LocalImageResolver,
    http: HttpImageResolver,
}

impl FeedImageResolver {
    pub fn new(local: LocalImageResolver, http: HttpImageResolver) -> Self {
        Self { local, http }
    }
}

impl ImageResolver for FeedImageResolver {
    fn resolve(&self, post: &Post, image: &ImageRef) -> ResolvedImage {
        if is_url(&image.source) {
            self.http.resolve(post, image)
        } else {
            self.local.resolve(post, image)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn post() -> Post {
        Post::new(
            "42",
            "t",
            DateTime::parse_from_rfc3339("2012-01-01T00:00:00Z").unwrap(),
            "body",
            vec![],
            0,
        )
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/a.jpg"));
        assert!(is_url("http://example.com/a.jpg"));
        assert!(!is_url("/tmp/a.jpg"));
        assert!(!is_url("a.jpg"));
    }

    #[test]
    fn local_copy_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        std::fs::write(base.path().join("cat.png"), b"png bytes").unwrap();
        let resolver = LocalImageResolver::new(base.path());
        let resolved = resolver.resolve(&post(), &ImageRef::new("cat.png"));
        let path = resolved.path().unwrap().to_path_buf();
        assert!(path.ends_with("42-cat.png"));
        assert!(path.exists());
        drop(resolved);
        assert!(!path.exists());
        assert!(base.path().join("cat.png").exists(), "original must survive");
    }

    #[test]
    fn missing_local_file_is_unresolved() {
        let base = tempfile::tempdir().unwrap();
        let resolver = LocalImageResolver::new(base.path());
        let resolved = resolver.resolve(&post(), &ImageRef::new("nope.png"));
        assert!(resolved.path().is_none());
        match resolved.load() {
            Err(ElementError::ResourceMissing { reference, .. }) => assert_eq!(reference, "nope.png"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn file_url_prefix_is_accepted() {
        let base = tempfile::tempdir().unwrap();
        let file = base.path().join("dog.png");
        std::fs::write(&file, b"x").unwrap();
        let resolver = LocalImageResolver::new("/unused");
        let source = format!("file://{}", file.display());
        assert!(resolver.resolve(&post(), &ImageRef::new(source)).path().is_some());
    }

    #[test]
    fn load_reports_the_original_reference() {
        let base = tempfile::tempdir().unwrap();
        std::fs::write(base.path().join("bad.png"), b"garbage").unwrap();
        let resolved = LocalImageResolver::new(base.path()).resolve(&post(), &ImageRef::new("bad.png"));
        match resolved.load() {
            Err(ElementError::ResourceMissing { reference, .. }) => assert_eq!(reference, "bad.png"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
