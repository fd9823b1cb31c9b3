//! Shared application state

use pdf_gallery::{
    BatchPreviewGenerator, Fetcher, GalleryConfig, HttpFetcher, PageRasterizer, PreviewCache,
    RenderTarget,
};
use std::sync::Arc;

/// State shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GalleryConfig,
    generator: BatchPreviewGenerator,
    fetcher: Arc<dyn Fetcher>,
}

impl AppState {
    pub fn new(config: GalleryConfig, rasterizer: PageRasterizer, fetcher: Arc<dyn Fetcher>) -> Self {
        let cache = PreviewCache::from_config(&config.cache);
        let generator =
            BatchPreviewGenerator::new(rasterizer, cache).with_concurrency(config.render.concurrency);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                generator,
                fetcher,
            }),
        }
    }

    /// State with the pdfium rasterizer and an HTTP fetcher, as configured
    pub fn from_config(config: GalleryConfig) -> Self {
        let rasterizer = PageRasterizer::pdfium(config.render.pdfium_library_path.clone());
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch));
        Self::new(config, rasterizer, fetcher)
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.inner.config
    }

    pub fn generator(&self) -> &BatchPreviewGenerator {
        &self.inner.generator
    }

    pub fn cache(&self) -> &PreviewCache {
        self.inner.generator.cache()
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.inner.fetcher.as_ref()
    }

    /// Apply server-wide render settings to a requested target
    pub fn adjust_target(&self, target: RenderTarget) -> RenderTarget {
        target.with_enlargement(!self.inner.config.render.without_enlargement)
    }
}
