//! Raster encoding
//!
//! JPEG output always carries the requested quality. PNG output uses the
//! strongest lossless compression and can optionally be quantized to an
//! indexed 256-color palette.

use super::target::RenderTarget;
use crate::types::*;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};

/// Encode a rendered page according to the target's format policy
pub fn encode(pixels: &RgbaImage, target: &RenderTarget) -> std::result::Result<Vec<u8>, String> {
    match target.format {
        ImageFormat::Jpeg => encode_jpeg(pixels, target.quality),
        ImageFormat::Png if target.reduce_palette => encode_png_indexed(pixels),
        ImageFormat::Png => encode_png(pixels),
    }
}

/// Composite onto white, since JPEG has no alpha channel
pub(crate) fn flatten(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> std::result::Result<Vec<u8>, String> {
    let rgb = flatten(pixels);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;
    Ok(out)
}

fn encode_png(pixels: &RgbaImage) -> std::result::Result<Vec<u8>, String> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(out)
}

/// Palette index for a color on the fixed 3-3-2 palette
fn palette_index(r: u8, g: u8, b: u8) -> u8 {
    (r & 0xE0) | ((g & 0xE0) >> 3) | (b >> 6)
}

/// The fixed 3-3-2 palette as packed RGB triples
fn palette() -> Vec<u8> {
    let expand = |value: u8, bits: u32| -> u8 {
        let max = (1u16 << bits) - 1;
        ((value as u16 * 255 + max / 2) / max) as u8
    };
    (0..=255u8)
        .flat_map(|i| [expand(i >> 5, 3), expand((i >> 2) & 0x07, 3), expand(i & 0x03, 2)])
        .collect()
}

fn encode_png_indexed(pixels: &RgbaImage) -> std::result::Result<Vec<u8>, String> {
    let rgb = flatten(pixels);
    let indices: Vec<u8> = rgb
        .pixels()
        .map(|p| palette_index(p.0[0], p.0[1], p.0[2]))
        .collect();

    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, rgb.width(), rgb.height());
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(palette());
    encoder.set_compression(png::Compression::Best);

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    writer
        .write_image_data(&indices)
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    writer
        .finish()
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(out)
}

/// Decode a JPEG or PNG image, trying the format its magic bytes suggest
/// first and the other one second.
pub fn decode(bytes: &[u8]) -> std::result::Result<(DynamicImage, ImageFormat), String> {
    let order = match ImageFormat::sniff(bytes) {
        Some(ImageFormat::Png) => [ImageFormat::Png, ImageFormat::Jpeg],
        _ => [ImageFormat::Jpeg, ImageFormat::Png],
    };

    let mut last_error = String::from("empty image data");
    for format in order {
        let codec = match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        };
        match image::load_from_memory_with_format(bytes, codec) {
            Ok(decoded) => return Ok((decoded, format)),
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(format!("not a decodable JPEG or PNG image ({})", last_error))
}

/// Re-encode an existing image at a tiered size.
///
/// The image is shrunk so its long edge fits the target, never enlarged,
/// and encoded with the same policy as page renders.
pub fn reencode(bytes: &[u8], target: &RenderTarget) -> Result<RasterResult> {
    let (decoded, _) = decode(bytes).map_err(GalleryError::InvalidInput)?;

    let geometry = PageGeometry::new(decoded.width() as f32, decoded.height() as f32);
    // Source pixels play the role of points here, so capping at scale 1
    // keeps the image from being enlarged.
    let sizing = target.with_enlargement(false);
    let (width, height) = sizing.pixel_size(geometry);

    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded.into_rgba8()
    } else {
        decoded
            .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
            .into_rgba8()
    };

    let bytes = encode(&resized, target).map_err(GalleryError::InvalidInput)?;
    Ok(RasterResult {
        bytes,
        format: target.format,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_covers_black_and_white() {
        let palette = palette();
        assert_eq!(palette.len(), 256 * 3);
        let black = palette_index(0, 0, 0) as usize * 3;
        let white = palette_index(255, 255, 255) as usize * 3;
        assert_eq!(&palette[black..black + 3], &[0, 0, 0]);
        assert_eq!(&palette[white..white + 3], &[255, 255, 255]);
    }

    #[test]
    fn test_flatten_transparent_is_white() {
        let pixels = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 0]));
        let flat = flatten(&pixels);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
