//! Render targets and the page-to-pixel scaling policy

use crate::constants::*;
use crate::types::*;

/// Resolution tier selected from a 0–100 quality value.
///
/// Tiers cap the pixel size of thumbnail-grade previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ResolutionTier {
    Small,
    Medium,
    Large,
}

impl ResolutionTier {
    pub fn for_quality(quality: u8) -> Self {
        if quality <= SMALL_TIER_MAX_QUALITY {
            ResolutionTier::Small
        } else if quality <= MEDIUM_TIER_MAX_QUALITY {
            ResolutionTier::Medium
        } else {
            ResolutionTier::Large
        }
    }

    /// Target long edge in pixels
    pub fn long_edge(self) -> u32 {
        match self {
            ResolutionTier::Small => SMALL_TIER_LONG_EDGE,
            ResolutionTier::Medium => MEDIUM_TIER_LONG_EDGE,
            ResolutionTier::Large => LARGE_TIER_LONG_EDGE,
        }
    }
}

/// How large a render should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSize {
    /// Long edge taken from a resolution tier
    Tier(ResolutionTier),
    /// Explicit long edge in pixels
    MaxDimension(u32),
    /// Render at a fixed resolution
    Dpi(u32),
}

/// Everything that determines the bytes of a render, apart from the page.
///
/// Two renders of the same page with equal targets are interchangeable, so
/// the target doubles as part of the preview cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    pub size: TargetSize,
    pub format: ImageFormat,
    /// Encoding quality, 0–100. Used as JPEG quality.
    pub quality: u8,
    /// Never render larger than the page's 72 DPI size
    pub without_enlargement: bool,
    /// Quantize PNG output to a 256-color palette
    pub reduce_palette: bool,
}

impl RenderTarget {
    /// Tiered target for a 0–100 quality value
    pub fn from_quality(quality: u8, format: ImageFormat) -> Self {
        let quality = quality.min(100);
        Self {
            size: TargetSize::Tier(ResolutionTier::for_quality(quality)),
            format,
            quality,
            without_enlargement: false,
            reduce_palette: false,
        }
    }

    pub fn max_dimension(long_edge: u32, format: ImageFormat, quality: u8) -> Self {
        Self {
            size: TargetSize::MaxDimension(long_edge),
            format,
            quality: quality.min(100),
            without_enlargement: false,
            reduce_palette: false,
        }
    }

    pub fn dpi(dpi: u32, format: ImageFormat, quality: u8) -> Self {
        Self {
            size: TargetSize::Dpi(dpi),
            format,
            quality: quality.min(100),
            without_enlargement: false,
            reduce_palette: false,
        }
    }

    pub fn with_enlargement(mut self, allowed: bool) -> Self {
        self.without_enlargement = !allowed;
        self
    }

    pub fn with_reduced_palette(mut self, reduce: bool) -> Self {
        self.reduce_palette = reduce;
        self
    }

    /// Pixels per point for a page of the given geometry
    pub fn scale_for(&self, geometry: PageGeometry) -> f32 {
        let scale = match self.size {
            TargetSize::Tier(tier) => tier.long_edge() as f32 / geometry.long_edge(),
            TargetSize::MaxDimension(px) => px as f32 / geometry.long_edge(),
            TargetSize::Dpi(dpi) => dpi_to_scale(dpi),
        };
        if self.without_enlargement {
            scale.min(1.0)
        } else {
            scale
        }
    }

    /// Output pixel size for a page, preserving its aspect ratio
    pub fn pixel_size(&self, geometry: PageGeometry) -> (u32, u32) {
        let mut scale = self.scale_for(geometry);
        // Keep pathological pages and targets within a sane buffer size
        let longest = geometry.long_edge() * scale;
        if longest > MAX_RENDER_EDGE as f32 {
            scale *= MAX_RENDER_EDGE as f32 / longest;
        }
        let width = (geometry.width * scale).round().max(1.0) as u32;
        let height = (geometry.height * scale).round().max(1.0) as u32;
        (width, height)
    }
}

impl QualityPreset {
    /// Export-grade JPEG target, rendered at the preset's DPI
    pub fn render_target(self) -> RenderTarget {
        RenderTarget::dpi(self.dpi(), ImageFormat::Jpeg, self.jpeg_quality())
    }

    /// Thumbnail-grade JPEG target in the preset's resolution tier
    pub fn preview_target(self) -> RenderTarget {
        RenderTarget::from_quality(self.jpeg_quality(), ImageFormat::Jpeg)
    }
}
