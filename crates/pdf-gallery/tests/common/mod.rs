#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_gallery::{Clock, Fetcher, GalleryError, RasterBackend};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub fn create_test_pdf(num_pages: usize) -> Document {
    create_pdf_with_sizes(&vec![(612.0, 792.0); num_pages])
}

/// Build a document with one page per `(width, height)` entry
pub fn create_pdf_with_sizes(sizes: &[(f32, f32)]) -> Document {
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
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(sizes.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));

    doc.trailer.set("Root", catalog_id);

    doc
}

pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

pub fn test_pdf_bytes(num_pages: usize) -> Vec<u8> {
    to_bytes(create_test_pdf(num_pages))
}

pub fn load_test_document(num_pages: usize) -> pdf_gallery::Document {
    pdf_gallery::load(test_pdf_bytes(num_pages)).unwrap()
}

/// Raster backend that paints each page a flat color derived from its
/// index, and fails on request.
#[derive(Default)]
pub struct FakeBackend {
    failing_pages: HashSet<usize>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render of these 1-indexed pages
    pub fn failing_on(mut self, pages: &[usize]) -> Self {
        self.failing_pages.extend(pages);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
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
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_pages.contains(&(page_index + 1)) {
            return Err("forced failure".to_string());
        }
        let shade = (page_index * 40 % 256) as u8;
        Ok(RgbaImage::from_pixel(width, height, Rgba([shade, 128, 255 - shade, 255])))
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: parking_lot::Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

pub fn sample_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 90, 255])
    })
}

pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let target = pdf_gallery::RenderTarget::max_dimension(width.max(height), pdf_gallery::ImageFormat::Jpeg, 80);
    pdf_gallery::render::encode(&sample_image(width, height), &target).unwrap()
}

pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let target = pdf_gallery::RenderTarget::max_dimension(width.max(height), pdf_gallery::ImageFormat::Png, 100);
    pdf_gallery::render::encode(&sample_image(width, height), &target).unwrap()
}

/// MediaBox width and height of each page of serialized output
pub fn page_sizes(bytes: &[u8]) -> Vec<(f32, f32)> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let media_box = doc
                .get_dictionary(id)
                .unwrap()
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .clone();
            let number = |o: &Object| match o {
                Object::Integer(i) => *i as f32,
                Object::Real(r) => *r,
                _ => panic!("non-numeric MediaBox entry"),
            };
            (number(&media_box[2]), number(&media_box[3]))
        })
        .collect()
}

/// Fetcher serving canned responses; unknown URLs are "not found"
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Vec<u8>>,
    delay: Duration,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), bytes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn serve(&self, url: &str) -> pdf_gallery::Result<Vec<u8>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| GalleryError::FetchFailure {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
    }
}

#[async_trait::async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch_pdf(&self, url: &str) -> pdf_gallery::Result<Vec<u8>> {
        self.serve(url).await
    }

    async fn fetch_image(&self, url: &str) -> pdf_gallery::Result<Vec<u8>> {
        self.serve(url).await
    }
}
