//! Export assembly
//!
//! Builds an output PDF with one page per image entry. Each page is exactly
//! the entry's requested size with the image stretched to fill it. Entries
//! whose image can't be decoded are skipped and reported rather than
//! failing the whole export.

use crate::render::decode;
use crate::types::*;
use image::{DynamicImage, GenericImageView};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// One image to place on its own output page
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub image: Vec<u8>,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
}

impl ExportEntry {
    pub fn new(image: Vec<u8>, width: f32, height: f32) -> Self {
        Self {
            image,
            width,
            height,
        }
    }

    /// Entry for a page preview. Sentinel previews produce an entry with no
    /// image data, which the assembler skips.
    pub fn from_preview(preview: &PagePreview) -> Self {
        Self::new(preview.image_bytes().to_vec(), preview.width, preview.height)
    }
}

/// An input entry left out of the output
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkippedEntry {
    /// Position of the entry in the request
    pub index: usize,
    pub reason: String,
}

/// Output of an assembly run
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    /// The serialized output document
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// Assemble entries into a new document, one page each, in input order.
///
/// Fails with `NothingToExport` when no entry could be embedded.
pub fn assemble(entries: &[ExportEntry]) -> Result<AssemblyReport> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    let mut skipped = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match add_image_page(&mut doc, pages_id, entry) {
            Ok(page_id) => kids.push(Object::Reference(page_id)),
            Err(reason) => {
                log::warn!("Skipping export entry {}: {}", index, reason);
                skipped.push(SkippedEntry { index, reason });
            }
        }
    }

    if kids.is_empty() {
        return Err(GalleryError::NothingToExport {
            skipped: skipped.len(),
        });
    }
    if !skipped.is_empty() {
        log::info!("{} of {} entries skipped during export", skipped.len(), entries.len());
    }

    let page_count = kids.len();
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_count as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    Ok(AssemblyReport {
        bytes,
        page_count,
        skipped,
    })
}

/// Embed one entry as a page. Nothing is added to `doc` unless the image
/// decodes.
fn add_image_page(
    doc: &mut Document,
    parent_id: ObjectId,
    entry: &ExportEntry,
) -> std::result::Result<ObjectId, String> {
    if !(entry.width > 0.0 && entry.height > 0.0) || !entry.width.is_finite() || !entry.height.is_finite() {
        return Err(format!(
            "invalid page size {}×{}",
            entry.width, entry.height
        ));
    }
    if entry.image.is_empty() {
        return Err("no image data".to_string());
    }

    let (decoded, format) = decode(&entry.image)?;
    let image_id = match (format, jpeg_components(&entry.image)) {
        (ImageFormat::Jpeg, Some(components @ (1 | 3))) => {
            add_jpeg_xobject(doc, &entry.image, &decoded, components)
        }
        // CMYK/YCCK data is left to the decoder rather than passed through
        _ => add_raw_xobject(doc, &decoded),
    };

    let content = format!(
        "q {} 0 0 {} 0 0 cm /Im0 Do Q\n",
        entry.width, entry.height
    );
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(parent_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(entry.width),
                Object::Real(entry.height),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]);
    Ok(doc.add_object(page))
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}

/// JPEG data is embedded as-is; PDF readers decode DCT natively
fn add_jpeg_xobject(
    doc: &mut Document,
    jpeg: &[u8],
    decoded: &DynamicImage,
    components: u8,
) -> ObjectId {
    let (width, height) = decoded.dimensions();
    let color_space = if components == 1 {
        "DeviceGray"
    } else {
        "DeviceRGB"
    };
    let mut dict = image_dict(width, height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    doc.add_object(Stream::new(dict, jpeg.to_vec()).with_compression(false))
}

/// Number of color components declared by a JPEG's frame header
pub(crate) fn jpeg_components(jpeg: &[u8]) -> Option<u8> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    loop {
        // Markers may be preceded by any number of fill bytes
        while *jpeg.get(pos)? == 0xFF && *jpeg.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        if *jpeg.get(pos)? != 0xFF {
            return None;
        }
        let marker = *jpeg.get(pos + 1)?;
        match marker {
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // Start of scan without a frame header
            0xDA | 0xD9 => return None,
            _ => {}
        }
        let length = u16::from_be_bytes([*jpeg.get(pos + 2)?, *jpeg.get(pos + 3)?]) as usize;
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            // length, precision, height, width, then the component count
            return jpeg.get(pos + 9).copied();
        }
        pos += 2 + length;
    }
}

/// Other formats are stored as raw samples, with alpha split into a soft mask
fn add_raw_xobject(doc: &mut Document, decoded: &DynamicImage) -> ObjectId {
    let (width, height) = decoded.dimensions();

    let smask_id = decoded.color().has_alpha().then(|| {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
        doc.add_object(Stream::new(image_dict(width, height, "DeviceGray"), alpha))
    });

    let mut dict = image_dict(width, height, "DeviceRGB");
    if let Some(smask_id) = smask_id {
        dict.set("SMask", Object::Reference(smask_id));
    }
    doc.add_object(Stream::new(dict, decoded.to_rgb8().into_raw()))
}
