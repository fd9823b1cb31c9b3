pub mod arrangement;
pub mod assemble;
pub mod batch;
pub mod cache;
pub mod constants;
pub mod document;
pub mod export;
pub mod extract;
pub mod fetch;
mod options;
pub mod render;
mod types;

pub use arrangement::Arrangement;
pub use assemble::{AssemblyReport, ExportEntry, SkippedEntry, assemble};
pub use batch::{BatchPreviewGenerator, BatchReport, CancelToken, PageFailure, PageOutcome, PageSource};
pub use cache::{CacheKey, Clock, PreviewCache, SystemClock};
pub use document::{Document, Fingerprint, load, load_bytes, load_pdf, save_pdf};
pub use export::{ExportImage, ExportOutcome, ExportRequest, ImageSource, export};
pub use extract::{extract_page, extract_pages};
pub use fetch::{Fetcher, HttpFetcher};
pub use options::*;
pub use render::{PageRasterizer, RasterBackend, RenderTarget, ResolutionTier, TargetSize};
pub use types::*;
