//! Shared constants for the preview pipeline
//!
//! This module centralizes magic numbers used across loading, rendering,
//! caching and export.

use std::time::Duration;

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Pixels per point when rendering at the given DPI
#[inline]
pub fn dpi_to_scale(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

/// Default page dimensions as tuple (width, height)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Resolution Tiers
// =============================================================================

/// Highest quality value that still selects the small tier
pub const SMALL_TIER_MAX_QUALITY: u8 = 32;

/// Highest quality value that still selects the medium tier
pub const MEDIUM_TIER_MAX_QUALITY: u8 = 75;

/// Long edge of small-tier renders (pixels)
pub const SMALL_TIER_LONG_EDGE: u32 = 120;

/// Long edge of medium-tier renders (pixels)
pub const MEDIUM_TIER_LONG_EDGE: u32 = 320;

/// Long edge of large-tier renders (pixels)
pub const LARGE_TIER_LONG_EDGE: u32 = 480;

/// Upper bound on any rendered edge, whatever the target asks for
pub const MAX_RENDER_EDGE: u32 = 10_000;

// =============================================================================
// Cache
// =============================================================================

pub const DEFAULT_CACHE_CAPACITY: usize = 500;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

// =============================================================================
// Concurrency and Timeouts
// =============================================================================

/// Pages rendered at once within a single batch
pub const DEFAULT_RENDER_CONCURRENCY: usize = 4;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Largest PDF accepted from URL intake (100 MiB)
pub const DEFAULT_MAX_PDF_BYTES: u64 = 100 * 1024 * 1024;
