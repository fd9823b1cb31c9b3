use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    #[error("Document has no pages")]
    EmptyDocument,
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    UnsupportedPage { page: usize, page_count: usize },
    #[error("Failed to render page {page}: {reason}")]
    RenderFailure { page: usize, reason: String },
    #[error("Timed out after {seconds}s fetching {url}")]
    FetchTimeout { url: String, seconds: u64 },
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },
    #[error("Export did not finish within {seconds}s")]
    ExportTimeout { seconds: u64 },
    #[error("No entries could be exported ({skipped} skipped)")]
    NothingToExport { skipped: usize },
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, GalleryError>;

/// A page's declared size in points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The larger of width and height
    pub fn long_edge(self) -> f32 {
        self.width.max(self.height)
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width / self.height
    }
}

/// Encoded output format of a raster image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// Identify an encoded image by its magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(GalleryError::InvalidInput(format!(
                "Unknown image format: {}",
                other
            ))),
        }
    }
}

/// An encoded raster image and its pixel dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct RasterResult {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Preview of one source page.
///
/// `width`/`height` are the page's output size in points, used both for
/// display sizing and as the page size on export. A page that failed to
/// render keeps its slot as a sentinel with no image and zero size.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePreview {
    /// 1-indexed source page number
    pub page_number: usize,
    pub image: Option<Arc<RasterResult>>,
    pub width: f32,
    pub height: f32,
}

impl PagePreview {
    pub fn sentinel(page_number: usize) -> Self {
        Self {
            page_number,
            image: None,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.image.is_none()
    }

    /// Encoded image bytes, empty for a sentinel
    pub fn image_bytes(&self) -> &[u8] {
        self.image.as_ref().map(|i| i.bytes.as_slice()).unwrap_or(&[])
    }
}

/// Preview quality presets offered to the gallery UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 3] = [QualityPreset::Low, QualityPreset::Medium, QualityPreset::High];

    pub fn name(self) -> &'static str {
        match self {
            QualityPreset::Low => "low",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "high",
        }
    }

    pub fn scale(self) -> u32 {
        match self {
            QualityPreset::Low => 1,
            QualityPreset::Medium => 2,
            QualityPreset::High => 3,
        }
    }

    pub fn dpi(self) -> u32 {
        match self {
            QualityPreset::Low => 72,
            QualityPreset::Medium => 150,
            QualityPreset::High => 300,
        }
    }

    /// Encoding quality, chosen so each preset lands in its own resolution tier
    pub fn jpeg_quality(self) -> u8 {
        match self {
            QualityPreset::Low => 30,
            QualityPreset::Medium => 70,
            QualityPreset::High => 90,
        }
    }

    /// File name offered for a download. Falls back to a preset-derived name
    /// when `base` is blank.
    pub fn download_name(self, base: &str) -> String {
        let base = base.trim();
        if base.is_empty() {
            return format!("gallery-{}-{}dpi.pdf", self.name(), self.dpi());
        }
        if base.to_ascii_lowercase().ends_with(".pdf") {
            base.to_string()
        } else {
            format!("{}.pdf", base)
        }
    }
}

impl std::str::FromStr for QualityPreset {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            other => Err(GalleryError::InvalidInput(format!(
                "Unknown quality preset: {}",
                other
            ))),
        }
    }
}
