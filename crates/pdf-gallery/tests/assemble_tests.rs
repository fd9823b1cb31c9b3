mod common;

use common::*;
use lopdf::Object;
use pdf_gallery::*;

#[test]
fn test_one_page_per_entry_at_requested_size() {
    let entries = vec![
        ExportEntry::new(sample_jpeg(40, 30), 400.0, 300.0),
        ExportEntry::new(sample_png(30, 40), 300.0, 400.0),
    ];

    let report = assemble(&entries).unwrap();
    assert_eq!(report.page_count, 2);
    assert!(report.skipped.is_empty());
    assert_eq!(page_sizes(&report.bytes), vec![(400.0, 300.0), (300.0, 400.0)]);

    let doc = load(report.bytes).unwrap();
    assert_eq!(doc.page_count(), 2);
}

#[test]
fn test_grayscale_jpeg_keeps_single_channel() {
    let gray = image::GrayImage::from_fn(16, 8, |x, _| image::Luma([(x * 16) as u8]));
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 80)
        .encode_image(&gray)
        .unwrap();

    let report = assemble(&[ExportEntry::new(jpeg.clone(), 160.0, 80.0)]).unwrap();

    let doc = lopdf::Document::load_mem(&report.bytes).unwrap();
    let embedded = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .find(|stream| stream.dict.get(b"Filter").ok() == Some(&Object::Name(b"DCTDecode".to_vec())))
        .expect("Expected a DCT image");
    assert_eq!(
        embedded.dict.get(b"ColorSpace").unwrap(),
        &Object::Name(b"DeviceGray".to_vec())
    );
    assert_eq!(embedded.content, jpeg);
}

#[test]
fn test_jpeg_is_embedded_without_recompression() {
    let jpeg = sample_jpeg(20, 20);
    let report = assemble(&[ExportEntry::new(jpeg.clone(), 100.0, 100.0)]).unwrap();

    let doc = lopdf::Document::load_mem(&report.bytes).unwrap();
    let embedded = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .find(|stream| stream.dict.get(b"Filter").ok() == Some(&Object::Name(b"DCTDecode".to_vec())))
        .unwrap();
    assert_eq!(embedded.content, jpeg);
}

#[test]
fn test_png_alpha_becomes_soft_mask() {
    let mut pixels = sample_image(8, 8);
    pixels.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
    let target = RenderTarget::max_dimension(8, ImageFormat::Png, 100);
    let png = render::encode(&pixels, &target).unwrap();

    let report = assemble(&[ExportEntry::new(png, 50.0, 50.0)]).unwrap();
    let doc = lopdf::Document::load_mem(&report.bytes).unwrap();
    let has_smask = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .any(|stream| stream.dict.has(b"SMask"));
    assert!(has_smask);
}

#[test]
fn test_skips_sentinel_and_corrupt_entries() {
    let entries = vec![
        ExportEntry::new(sample_jpeg(10, 10), 100.0, 100.0),
        ExportEntry::from_preview(&PagePreview::sentinel(2)),
        ExportEntry::new(b"corrupt".to_vec(), 100.0, 100.0),
        ExportEntry::new(sample_png(10, 10), 200.0, 100.0),
    ];

    let report = assemble(&entries).unwrap();
    assert_eq!(report.page_count, 2);
    let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert_eq!(page_sizes(&report.bytes), vec![(100.0, 100.0), (200.0, 100.0)]);
}

#[test]
fn test_invalid_page_size_is_skipped() {
    let entries = vec![
        ExportEntry::new(sample_jpeg(10, 10), 0.0, 100.0),
        ExportEntry::new(sample_jpeg(10, 10), 100.0, f32::NAN),
        ExportEntry::new(sample_jpeg(10, 10), 72.0, 72.0),
    ];

    let report = assemble(&entries).unwrap();
    assert_eq!(report.page_count, 1);
    assert_eq!(report.skipped.len(), 2);
}

#[test]
fn test_nothing_to_export() {
    let entries = vec![
        ExportEntry::new(Vec::new(), 100.0, 100.0),
        ExportEntry::new(b"nope".to_vec(), 100.0, 100.0),
    ];

    assert!(matches!(
        assemble(&entries),
        Err(GalleryError::NothingToExport { skipped: 2 })
    ));
    assert!(matches!(
        assemble(&[]),
        Err(GalleryError::NothingToExport { skipped: 0 })
    ));
}
