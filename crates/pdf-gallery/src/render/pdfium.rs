use super::RasterBackend;
use crate::document::Document;
use image::RgbaImage;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use std::path::PathBuf;

/// Environment variable naming a directory that holds the pdfium library
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Native rasterizer backed by pdfium.
///
/// pdfium is NOT thread-safe, so every render holds an exclusive lock for
/// the whole bind-load-render sequence.
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl PdfiumBackend {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self {
            library_path,
            lock: Mutex::new(()),
        }
    }

    /// Bind to pdfium, trying the configured directory, then
    /// `$PDFIUM_LIB_PATH`, then `vendor/pdfium/lib`, then the system library.
    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        let env_path = std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from);
        let vendor_path = std::env::current_dir()
            .ok()
            .map(|dir| dir.join("vendor/pdfium/lib"));

        let candidates = self
            .library_path
            .iter()
            .cloned()
            .chain(env_path)
            .chain(vendor_path)
            .filter(|dir| dir.exists());

        for dir in candidates {
            match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)) {
                Ok(bindings) => return Ok(Pdfium::new(bindings)),
                Err(e) => log::debug!("pdfium not usable at {}: {}", dir.display(), e),
            }
        }

        Pdfium::bind_to_system_library().map(Pdfium::new)
    }
}

impl RasterBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn rasterize(
        &self,
        document: &Document,
        page_index: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, String> {
        let _guard = self.lock.lock();

        let pdfium = self.bind().map_err(|e| format!("pdfium unavailable: {}", e))?;
        let pdf = pdfium
            .load_pdf_from_byte_slice(document.bytes(), None)
            .map_err(|e| format!("pdfium could not open document: {}", e))?;
        let index = u16::try_from(page_index)
            .map_err(|_| format!("page index {} exceeds pdfium's range", page_index))?;
        let page = pdf
            .pages()
            .get(index)
            .map_err(|e| format!("pdfium could not load page: {}", e))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| format!("pdfium render failed: {}", e))?;

        Ok(bitmap.as_image().into_rgba8())
    }
}
