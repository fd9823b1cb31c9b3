//! Batch preview generation
//!
//! Renders every page of a document, consulting the preview cache first.
//! Pages may render concurrently (up to a fixed limit) but results are
//! always emitted in page order, each carrying the completion fraction so
//! far. A page that fails to render yields a sentinel preview and the batch
//! carries on.

use crate::cache::{CacheKey, PreviewCache};
use crate::document::{self, Document};
use crate::extract::extract_page;
use crate::render::{PageRasterizer, RenderTarget};
use crate::types::*;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag for stopping a batch early.
///
/// Once cancelled, no further page renders are started. Renders already in
/// flight finish, but their results are dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where a successful preview came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    Rendered,
    Cached,
}

/// Result for one page of a batch
#[derive(Debug)]
pub struct PageOutcome {
    /// The page's preview, or its sentinel if rendering failed
    pub preview: PagePreview,
    pub status: Result<PageSource>,
    /// Pages finished so far, including this one
    pub completed: usize,
    pub total: usize,
}

impl PageOutcome {
    /// Completion fraction after this page, reaching exactly 1.0 on the last
    pub fn progress(&self) -> f64 {
        self.completed as f64 / self.total as f64
    }
}

/// A page that could not be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub page_number: usize,
    pub reason: String,
}

/// Aggregated result of a whole batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One entry per processed page, in page order
    pub previews: Vec<PagePreview>,
    pub rendered: usize,
    pub cached: usize,
    pub failures: Vec<PageFailure>,
    /// The batch stopped before every page was processed
    pub cancelled: bool,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.rendered + self.cached
    }

    fn record(&mut self, outcome: PageOutcome) {
        match outcome.status {
            Ok(PageSource::Rendered) => self.rendered += 1,
            Ok(PageSource::Cached) => self.cached += 1,
            Err(e) => self.failures.push(PageFailure {
                page_number: outcome.preview.page_number,
                reason: e.to_string(),
            }),
        }
        self.previews.push(outcome.preview);
    }
}

/// Renders previews for every page of a document
#[derive(Debug, Clone)]
pub struct BatchPreviewGenerator {
    rasterizer: PageRasterizer,
    cache: PreviewCache,
    concurrency: usize,
}

impl BatchPreviewGenerator {
    pub fn new(rasterizer: PageRasterizer, cache: PreviewCache) -> Self {
        Self {
            rasterizer,
            cache,
            concurrency: crate::constants::DEFAULT_RENDER_CONCURRENCY,
        }
    }

    /// Limit how many pages render at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn rasterizer(&self) -> &PageRasterizer {
        &self.rasterizer
    }

    /// Lazily preview every page, in page order.
    ///
    /// The stream yields exactly `page_count` outcomes. Nothing is rendered
    /// until it is polled, and each call starts an independent run.
    pub fn generate_all(
        &self,
        document: &Document,
        target: RenderTarget,
    ) -> BoxStream<'static, PageOutcome> {
        self.generate_all_cancellable(document, target, CancelToken::new())
    }

    /// Like [`generate_all`](Self::generate_all), stopping once `cancel` fires
    pub fn generate_all_cancellable(
        &self,
        document: &Document,
        target: RenderTarget,
        cancel: CancelToken,
    ) -> BoxStream<'static, PageOutcome> {
        let total = document.page_count();
        let generator = self.clone();
        let document = document.clone();
        let issue_cancel = cancel.clone();

        stream::iter(1..=total)
            .take_while(move |_| future::ready(!issue_cancel.is_cancelled()))
            .map(move |page_number| {
                let generator = generator.clone();
                let document = document.clone();
                async move { generator.preview_page(&document, page_number, &target).await }
            })
            .buffered(self.concurrency)
            .take_while(move |_| future::ready(!cancel.is_cancelled()))
            .enumerate()
            .map(move |(index, (preview, status))| PageOutcome {
                preview,
                status,
                completed: index + 1,
                total,
            })
            .boxed()
    }

    /// Run a whole batch and aggregate the outcomes
    pub async fn generate_report(
        &self,
        document: &Document,
        target: RenderTarget,
        cancel: &CancelToken,
    ) -> BatchReport {
        let total = document.page_count();
        let mut outcomes = self.generate_all_cancellable(document, target, cancel.clone());

        let mut report = BatchReport {
            previews: Vec::with_capacity(total),
            ..Default::default()
        };
        while let Some(outcome) = outcomes.next().await {
            report.record(outcome);
        }
        report.cancelled = report.previews.len() < total;

        if report.cancelled {
            log::info!(
                "Preview batch for {} cancelled after {} of {} pages",
                document.fingerprint(),
                report.previews.len(),
                total
            );
        } else {
            log::info!(
                "Previewed {} pages of {} ({} rendered, {} cached, {} failed)",
                total,
                document.fingerprint(),
                report.rendered,
                report.cached,
                report.failed()
            );
        }
        report
    }

    /// Load a document and preview all of its pages.
    ///
    /// Only a failure to load the document is an error; page failures are
    /// reported in the returned report.
    pub async fn generate_from_bytes(
        &self,
        bytes: Vec<u8>,
        target: RenderTarget,
        cancel: &CancelToken,
    ) -> Result<(Document, BatchReport)> {
        let document = document::load_bytes(bytes).await?;
        let report = self.generate_report(&document, target, cancel).await;
        Ok((document, report))
    }

    /// Preview one page on its own: the page is extracted into a
    /// single-page document and that is rasterized.
    ///
    /// Shares the cache with batch runs (keyed by the source document), and
    /// unlike a batch, a failure is returned as an error.
    pub async fn preview_single(
        &self,
        document: &Document,
        page_number: usize,
        target: RenderTarget,
    ) -> Result<(PagePreview, PageSource)> {
        document.check_page(page_number)?;

        let key = CacheKey::new(document.fingerprint(), page_number, target);
        if let Some(hit) = self.cache.get(&key) {
            return Ok((preview_for(document, page_number, hit), PageSource::Cached));
        }

        let source = document.clone();
        let single =
            tokio::task::spawn_blocking(move || extract_page(&source, page_number)).await??;
        let result = Arc::new(self.rasterizer.render(&single, 1, &target).await.map_err(
            |e| match e {
                GalleryError::RenderFailure { reason, .. } => GalleryError::RenderFailure {
                    page: page_number,
                    reason,
                },
                other => other,
            },
        )?);
        self.cache.put(key, Arc::clone(&result));

        Ok((preview_for(document, page_number, result), PageSource::Rendered))
    }

    async fn preview_page(
        &self,
        document: &Document,
        page_number: usize,
        target: &RenderTarget,
    ) -> (PagePreview, Result<PageSource>) {
        let key = CacheKey::new(document.fingerprint(), page_number, *target);
        if let Some(hit) = self.cache.get(&key) {
            return (
                preview_for(document, page_number, hit),
                Ok(PageSource::Cached),
            );
        }

        match self.rasterizer.render(document, page_number, target).await {
            Ok(result) => {
                let result = Arc::new(result);
                self.cache.put(key, Arc::clone(&result));
                (
                    preview_for(document, page_number, result),
                    Ok(PageSource::Rendered),
                )
            }
            Err(e) => {
                log::warn!(
                    "Page {} of {} failed to render: {}",
                    page_number,
                    document.fingerprint(),
                    e
                );
                (PagePreview::sentinel(page_number), Err(e))
            }
        }
    }
}

fn preview_for(document: &Document, page_number: usize, image: Arc<RasterResult>) -> PagePreview {
    let geometry = document.geometry()[page_number - 1];
    PagePreview {
        page_number,
        image: Some(image),
        width: geometry.width,
        height: geometry.height,
    }
}
