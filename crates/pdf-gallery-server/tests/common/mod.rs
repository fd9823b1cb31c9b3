#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_gallery::{
    Fetcher, GalleryConfig, GalleryError, ImageFormat, PageRasterizer, RasterBackend, RenderTarget,
};
use pdf_gallery_server::AppState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BOUNDARY: &str = "gallery-test-boundary";

pub fn pdf_with_sizes(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for &(width, height) in sizes {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(sizes.len() as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn letter_pdf(num_pages: usize) -> Vec<u8> {
    pdf_with_sizes(&vec![(612.0, 792.0); num_pages])
}

pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 5 % 256) as u8, (y * 3 % 256) as u8, 60, 255])
    });
    let target = RenderTarget::max_dimension(width.max(height), ImageFormat::Jpeg, 80);
    pdf_gallery::render::encode(&pixels, &target).unwrap()
}

/// Flat-color raster backend counting its calls
#[derive(Default)]
pub struct FakeBackend {
    failing_pages: HashSet<usize>,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn failing_on(pages: &[usize]) -> Self {
        Self {
            failing_pages: pages.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RasterBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn rasterize(
        &self,
        _document: &pdf_gallery::Document,
        page_index: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_pages.contains(&(page_index + 1)) {
            return Err("forced failure".to_string());
        }
        Ok(RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255])))
    }
}

/// Fetcher serving canned responses
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait::async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch_pdf(&self, url: &str) -> pdf_gallery::Result<Vec<u8>> {
        self.fetch_image(url).await
    }

    async fn fetch_image(&self, url: &str) -> pdf_gallery::Result<Vec<u8>> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| GalleryError::FetchFailure {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
    }
}

pub fn test_state(backend: Arc<FakeBackend>, fetcher: StaticFetcher) -> AppState {
    AppState::new(
        GalleryConfig::default(),
        PageRasterizer::new(backend),
        Arc::new(fetcher),
    )
}

/// A multipart field: name, optional file name, content
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
