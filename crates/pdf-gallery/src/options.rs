use crate::constants::*;
use crate::types::*;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gallery configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GalleryConfig {
    pub cache: CacheConfig,
    pub render: RenderConfig,
    pub fetch: FetchConfig,
    pub export: ExportConfig,
}

/// Preview cache bounds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Maximum number of cached renders
    pub capacity: usize,
    /// Seconds before an entry expires regardless of use
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    /// Pages rendered at once within a batch
    pub concurrency: usize,
    /// Cap renders at the page's 72 DPI size
    pub without_enlargement: bool,
    /// Location of the native rasterizer library, if not on the default search path
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_RENDER_CONCURRENCY,
            without_enlargement: false,
            pdfium_library_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_pdf_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_pdf_bytes: DEFAULT_MAX_PDF_BYTES,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExportConfig {
    /// Wall-clock ceiling for a whole export request
    pub timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_EXPORT_TIMEOUT.as_secs(),
        }
    }
}

impl ExportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GalleryConfig {
    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| GalleryError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| GalleryError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(GalleryError::Config(
                "Cache capacity must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(GalleryError::Config(
                "Cache TTL must be at least one second".to_string(),
            ));
        }
        if self.render.concurrency == 0 {
            return Err(GalleryError::Config(
                "Render concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_secs == 0 || self.export.timeout_secs == 0 {
            return Err(GalleryError::Config(
                "Timeouts must be at least one second".to_string(),
            ));
        }
        if self.fetch.max_pdf_bytes == 0 {
            return Err(GalleryError::Config(
                "Maximum PDF size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
