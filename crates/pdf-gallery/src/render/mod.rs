//! Page rasterization
//!
//! This module turns one page of a loaded document into an encoded image:
//! - [`RasterBackend`] renders a page to an RGBA pixel buffer
//! - [`RenderTarget`] decides the pixel size and encoding
//! - [`PageRasterizer`] validates the request, sizes it and encodes the result
//!
//! Rasterization never touches the preview cache; callers compose the two.

mod encode;
#[cfg(feature = "pdfium")]
mod pdfium;
mod target;

pub use encode::{decode, encode, reencode};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumBackend;
pub use target::{RenderTarget, ResolutionTier, TargetSize};

use crate::document::Document;
use crate::types::*;
use image::RgbaImage;
use std::sync::Arc;

/// A way of rendering a PDF page to pixels.
///
/// Implementations are called from the blocking thread pool and may take
/// as long as they need. Errors are reported as plain messages and become
/// `RenderFailure` for the page.
pub trait RasterBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Render the zero-based `page_index` of `document` at exactly
    /// `width` × `height` pixels.
    fn rasterize(
        &self,
        document: &Document,
        page_index: usize,
        width: u32,
        height: u32,
    ) -> std::result::Result<RgbaImage, String>;
}

/// Renders document pages to encoded images through a backend
#[derive(Clone)]
pub struct PageRasterizer {
    backend: Arc<dyn RasterBackend>,
}

impl std::fmt::Debug for PageRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRasterizer")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl PageRasterizer {
    pub fn new(backend: Arc<dyn RasterBackend>) -> Self {
        Self { backend }
    }

    /// Rasterizer backed by the native pdfium library
    #[cfg(feature = "pdfium")]
    pub fn pdfium(library_path: Option<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(PdfiumBackend::new(library_path)))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Render a 1-indexed page.
    ///
    /// Fails with `UnsupportedPage` for page numbers outside the document and
    /// with `RenderFailure` when the backend or the encoder errors.
    pub async fn render(
        &self,
        document: &Document,
        page_number: usize,
        target: &RenderTarget,
    ) -> Result<RasterResult> {
        let geometry = document.page_geometry(page_number)?;
        let (width, height) = target.pixel_size(geometry);

        let backend = Arc::clone(&self.backend);
        let document = document.clone();
        let target = *target;

        let rendered = tokio::task::spawn_blocking(move || {
            let pixels = backend.rasterize(&document, page_number - 1, width, height)?;
            // Backends may round differently, so report what was produced
            let (width, height) = pixels.dimensions();
            let bytes = encode(&pixels, &target)?;
            Ok::<_, String>(RasterResult {
                bytes,
                format: target.format,
                width,
                height,
            })
        })
        .await;

        match rendered {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(reason)) => Err(GalleryError::RenderFailure {
                page: page_number,
                reason,
            }),
            Err(e) => Err(GalleryError::RenderFailure {
                page: page_number,
                reason: format!("render task failed: {}", e),
            }),
        }
    }
}
