//! Export requests
//!
//! Resolves each requested image (inline or fetched), assembles the output
//! document and bounds the whole operation by a wall-clock ceiling. An image
//! that can't be fetched or decoded is skipped; only a timeout or having
//! nothing at all to export fails the request.

use crate::assemble::{ExportEntry, SkippedEntry, assemble};
use crate::fetch::Fetcher;
use crate::options::ExportConfig;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where an export image comes from
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ImageSource {
    Url(String),
    /// Image bytes already in hand
    #[cfg_attr(feature = "serde", serde(skip))]
    Bytes(Vec<u8>),
}

/// One image of an export request, with its output page size in points
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportImage {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub source: ImageSource,
    pub width: f32,
    pub height: f32,
}

impl ExportImage {
    pub fn from_preview(preview: &PagePreview) -> Self {
        Self {
            source: ImageSource::Bytes(preview.image_bytes().to_vec()),
            width: preview.width,
            height: preview.height,
        }
    }
}

/// Images in final page order (the caller applies any arrangement)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportRequest {
    pub images: Vec<ExportImage>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub filename: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub quality: QualityPreset,
}

impl ExportRequest {
    pub fn from_previews<'a>(
        previews: impl IntoIterator<Item = &'a PagePreview>,
        filename: impl Into<String>,
        quality: QualityPreset,
    ) -> Self {
        Self {
            images: previews.into_iter().map(ExportImage::from_preview).collect(),
            filename: filename.into(),
            quality,
        }
    }

    /// Normalized download file name
    pub fn download_name(&self) -> String {
        self.quality.download_name(&self.filename)
    }
}

/// A finished export
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
    /// Entries left out, by position in the request
    pub skipped: Vec<SkippedEntry>,
}

/// Run an export request.
///
/// Fails with `ExportTimeout` if the whole operation exceeds the configured
/// ceiling, discarding any partial output.
pub async fn export(
    request: ExportRequest,
    fetcher: &dyn Fetcher,
    config: &ExportConfig,
) -> Result<ExportOutcome> {
    let timeout = config.timeout();
    match tokio::time::timeout(timeout, export_inner(request, fetcher)).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("Export abandoned after {:?}", timeout);
            Err(GalleryError::ExportTimeout {
                seconds: timeout.as_secs(),
            })
        }
    }
}

async fn export_inner(request: ExportRequest, fetcher: &dyn Fetcher) -> Result<ExportOutcome> {
    let filename = request.download_name();
    let requested = request.images.len();

    // Positions in the request of the entries handed to the assembler
    let mut positions = Vec::with_capacity(requested);
    let mut entries = Vec::with_capacity(requested);
    let mut skipped = Vec::new();

    for (index, image) in request.images.into_iter().enumerate() {
        let bytes = match image.source {
            ImageSource::Bytes(bytes) => bytes,
            ImageSource::Url(url) => match fetcher.fetch_image(&url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Skipping export entry {}: {}", index, e);
                    skipped.push(SkippedEntry {
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            },
        };
        positions.push(index);
        entries.push(ExportEntry::new(bytes, image.width, image.height));
    }

    let assembled = tokio::task::spawn_blocking(move || assemble(&entries)).await?;
    let report = match assembled {
        Ok(report) => report,
        Err(GalleryError::NothingToExport { .. }) => {
            return Err(GalleryError::NothingToExport { skipped: requested });
        }
        Err(e) => return Err(e),
    };

    skipped.extend(report.skipped.into_iter().map(|entry| SkippedEntry {
        index: positions[entry.index],
        reason: entry.reason,
    }));
    skipped.sort_by_key(|entry| entry.index);

    log::info!(
        "Exported {} ({} pages, {} of {} entries skipped)",
        filename,
        report.page_count,
        skipped.len(),
        requested
    );

    Ok(ExportOutcome {
        bytes: report.bytes,
        filename,
        page_count: report.page_count,
        skipped,
    })
}
