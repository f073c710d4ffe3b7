//! Decoding local image files into PDF image XObject data.
//!
//! Every format the `image` crate decodes is converted to 8-bit RGB and
//! zlib-compressed for a `FlateDecode` stream. An alpha channel, if any
//! pixel is translucent, becomes a separate soft mask.

use crate::error::ElementError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A decoded image ready to be embedded.
#[derive(Clone)]
pub struct PdfImage {
    source: PathBuf,
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl std::fmt::Debug for PdfImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfImage")
            .field("source", &self.source)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgb_bytes", &self.rgb.len())
            .field("has_alpha", &self.alpha.is_some())
            .finish()
    }
}

impl PdfImage {
    /// Load and decode the image at `path`.
    ///
    /// # Errors
    /// [`ElementError::ResourceMissing`] when the file does not exist or
    /// cannot be decoded.
    pub fn load(path: &Path) -> Result<Self, ElementError> {
        let missing = |detail: String| ElementError::ResourceMissing {
            reference: path.display().to_string(),
            detail,
        };
        if !path.is_file() {
            return Err(missing("file not found".into()));
        }
        let decoded = image::open(path).map_err(|e| missing(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(missing("image has no pixels".into()));
        }

        let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
        let rgb_data: Vec<u8> = rgba
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        let rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);
        let alpha = has_alpha.then(|| {
            let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
            miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
        });

        debug!(
            "Decoded {} ({}×{}px, alpha={})",
            path.display(),
            width,
            height,
            has_alpha
        );
        Ok(Self {
            source: path.to_path_buf(),
            width,
            height,
            rgb,
            alpha,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Intrinsic width in pixels; one pixel is drawn as one point.
    pub fn pixel_width(&self) -> u32 {
        self.width
    }

    pub fn pixel_height(&self) -> u32 {
        self.height
    }

    pub(crate) fn rgb_data(&self) -> &[u8] {
        &self.rgb
    }

    pub(crate) fn alpha_data(&self) -> Option<&[u8]> {
        self.alpha.as_deref()
    }
}
