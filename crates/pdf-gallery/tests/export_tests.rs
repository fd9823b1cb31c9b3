mod common;

use common::*;
use pdf_gallery::*;
use std::sync::Arc;
use std::time::Duration;

async fn previews_for(sizes: &[(f32, f32)], failing: &[usize]) -> Vec<PagePreview> {
    let backend = Arc::new(FakeBackend::new().failing_on(failing));
    let generator = BatchPreviewGenerator::new(PageRasterizer::new(backend), PreviewCache::default());
    let doc = load(to_bytes(create_pdf_with_sizes(sizes))).unwrap();
    generator
        .generate_report(&doc, QualityPreset::Low.render_target(), &CancelToken::new())
        .await
        .previews
}

#[tokio::test]
async fn test_export_skips_failed_page() {
    let previews = previews_for(&[(612.0, 792.0); 3], &[2]).await;
    let request = ExportRequest::from_previews(&previews, "report", QualityPreset::Medium);

    let outcome = export(request, &StaticFetcher::new(), &ExportConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.page_count, 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].index, 1);
    assert_eq!(outcome.filename, "report.pdf");
    assert_eq!(load(outcome.bytes).unwrap().page_count(), 2);
}

#[tokio::test]
async fn test_export_follows_arrangement() {
    let sizes = [(100.0, 200.0), (300.0, 400.0), (500.0, 600.0)];
    let previews = previews_for(&sizes, &[]).await;

    let arrangement = Arrangement::from_indices(vec![2, 0, 1]).unwrap();
    let ordered = arrangement.apply(&previews).unwrap();
    let request = ExportRequest::from_previews(ordered, "", QualityPreset::High);

    let outcome = export(request, &StaticFetcher::new(), &ExportConfig::default())
        .await
        .unwrap();

    assert_eq!(
        page_sizes(&outcome.bytes),
        vec![(500.0, 600.0), (100.0, 200.0), (300.0, 400.0)]
    );
    assert_eq!(outcome.filename, "gallery-high-300dpi.pdf");
}

/// Pixel size of every image XObject in serialized output
fn embedded_image_sizes(bytes: &[u8]) -> Vec<(i64, i64)> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let mut sizes: Vec<(i64, i64)> = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .filter(|stream| {
            stream.dict.get(b"Subtype").and_then(|s| s.as_name()).ok() == Some(b"Image".as_slice())
        })
        .map(|stream| {
            (
                stream.dict.get(b"Width").unwrap().as_i64().unwrap(),
                stream.dict.get(b"Height").unwrap().as_i64().unwrap(),
            )
        })
        .collect();
    sizes.sort();
    sizes
}

#[tokio::test]
async fn test_export_embeds_preset_resolution() {
    let backend = Arc::new(FakeBackend::new());
    let generator = BatchPreviewGenerator::new(PageRasterizer::new(backend), PreviewCache::default());
    let doc = load(to_bytes(create_pdf_with_sizes(&[(144.0, 72.0)]))).unwrap();

    let report = generator
        .generate_report(&doc, QualityPreset::High.render_target(), &CancelToken::new())
        .await;
    let request = ExportRequest::from_previews(&report.previews, "", QualityPreset::High);
    let outcome = export(request, &StaticFetcher::new(), &ExportConfig::default())
        .await
        .unwrap();

    // 2in × 1in at 300 dpi, on a page of the original point size
    assert_eq!(embedded_image_sizes(&outcome.bytes), vec![(600, 300)]);
    assert_eq!(page_sizes(&outcome.bytes), vec![(144.0, 72.0)]);
}

#[tokio::test]
async fn test_export_fetches_urls_and_skips_failures() {
    let fetcher = StaticFetcher::new()
        .with("https://cdn.example/a.jpg", sample_jpeg(20, 10))
        .with("https://cdn.example/c.png", sample_png(10, 20));

    let request = ExportRequest {
        images: vec![
            ExportImage {
                source: ImageSource::Url("https://cdn.example/a.jpg".to_string()),
                width: 200.0,
                height: 100.0,
            },
            ExportImage {
                source: ImageSource::Url("https://cdn.example/missing.jpg".to_string()),
                width: 200.0,
                height: 100.0,
            },
            ExportImage {
                source: ImageSource::Url("https://cdn.example/c.png".to_string()),
                width: 100.0,
                height: 200.0,
            },
        ],
        filename: "photos.PDF".to_string(),
        quality: QualityPreset::Low,
    };

    let outcome = export(request, &fetcher, &ExportConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.page_count, 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].index, 1);
    assert!(outcome.skipped[0].reason.contains("not found"));
    assert_eq!(outcome.filename, "photos.PDF");
    assert_eq!(page_sizes(&outcome.bytes), vec![(200.0, 100.0), (100.0, 200.0)]);
}

#[tokio::test]
async fn test_skipped_indices_cover_fetch_and_decode_failures() {
    let fetcher = StaticFetcher::new().with("https://cdn.example/bad", b"garbage".to_vec());
    let request = ExportRequest {
        images: vec![
            ExportImage {
                source: ImageSource::Url("https://cdn.example/bad".to_string()),
                width: 10.0,
                height: 10.0,
            },
            ExportImage {
                source: ImageSource::Url("https://cdn.example/gone".to_string()),
                width: 10.0,
                height: 10.0,
            },
            ExportImage {
                source: ImageSource::Bytes(sample_jpeg(10, 10)),
                width: 10.0,
                height: 10.0,
            },
        ],
        filename: String::new(),
        quality: QualityPreset::Medium,
    };

    let outcome = export(request, &fetcher, &ExportConfig::default())
        .await
        .unwrap();
    let skipped: Vec<usize> = outcome.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![0, 1]);
    assert_eq!(outcome.page_count, 1);
}

#[tokio::test]
async fn test_export_with_nothing_usable() {
    let previews = previews_for(&[(612.0, 792.0); 2], &[1, 2]).await;
    let request = ExportRequest::from_previews(&previews, "empty", QualityPreset::Medium);

    let result = export(request, &StaticFetcher::new(), &ExportConfig::default()).await;
    assert!(matches!(result, Err(GalleryError::NothingToExport { skipped: 2 })));
}

#[tokio::test(start_paused = true)]
async fn test_export_timeout() {
    let fetcher = StaticFetcher::new()
        .with("https://slow.example/a.jpg", sample_jpeg(10, 10))
        .with_delay(Duration::from_secs(600));
    let request = ExportRequest {
        images: vec![ExportImage {
            source: ImageSource::Url("https://slow.example/a.jpg".to_string()),
            width: 10.0,
            height: 10.0,
        }],
        filename: String::new(),
        quality: QualityPreset::Medium,
    };

    let result = export(request, &fetcher, &ExportConfig::default()).await;
    assert!(matches!(result, Err(GalleryError::ExportTimeout { seconds: 300 })));
}

#[test]
fn test_request_json_shape() {
    let json = r#"{
        "images": [{"url": "https://cdn.example/a.jpg", "width": 612, "height": 792}],
        "filename": "out",
        "quality": "high"
    }"#;
    let request: ExportRequest = serde_json::from_str(json).unwrap();

    assert_eq!(request.images.len(), 1);
    assert_eq!(
        request.images[0].source,
        ImageSource::Url("https://cdn.example/a.jpg".to_string())
    );
    assert_eq!(request.images[0].width, 612.0);
    assert_eq!(request.quality, QualityPreset::High);
    assert_eq!(request.download_name(), "out.pdf");

    let minimal: ExportRequest = serde_json::from_str(r#"{"images": []}"#).unwrap();
    assert_eq!(minimal.quality, QualityPreset::Medium);
    assert_eq!(minimal.download_name(), "gallery-medium-150dpi.pdf");
}
