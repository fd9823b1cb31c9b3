//! Document loading
//!
//! Parses raw PDF bytes into an immutable, cheaply cloneable [`Document`]
//! handle exposing page count, page geometry and a content fingerprint.

mod geometry;

pub(crate) use geometry::{INHERITABLE_KEYS, inherited_attribute};
pub use geometry::page_geometry;

use crate::types::*;
use lopdf::ObjectId;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// SHA-256 digest of a document's source bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

struct Inner {
    bytes: Vec<u8>,
    fingerprint: Fingerprint,
    page_ids: Vec<ObjectId>,
    geometry: Vec<PageGeometry>,
    pdf: lopdf::Document,
}

/// A parsed PDF.
///
/// Immutable once loaded; clones share the same parsed data.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Inner>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("fingerprint", &self.inner.fingerprint)
            .field("page_count", &self.page_count())
            .finish()
    }
}

impl Document {
    /// Parse a document from its serialized bytes.
    ///
    /// Fails with `MalformedDocument` when the bytes aren't a parseable PDF
    /// and with `EmptyDocument` when it has no pages.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let pdf = lopdf::Document::load_mem(&bytes)
            .map_err(|e| GalleryError::MalformedDocument(e.to_string()))?;

        let page_ids: Vec<ObjectId> = pdf.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(GalleryError::EmptyDocument);
        }

        let geometry = page_ids
            .iter()
            .map(|&id| page_geometry(&pdf, id))
            .collect();
        let fingerprint = Fingerprint::of(&bytes);

        log::debug!(
            "Loaded document {} with {} pages",
            fingerprint,
            page_ids.len()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                bytes,
                fingerprint,
                page_ids,
                geometry,
                pdf,
            }),
        })
    }

    pub fn page_count(&self) -> usize {
        self.inner.page_ids.len()
    }

    /// Geometry of every page, in page order
    pub fn geometry(&self) -> &[PageGeometry] {
        &self.inner.geometry
    }

    /// Geometry of a 1-indexed page
    pub fn page_geometry(&self, page_number: usize) -> Result<PageGeometry> {
        self.check_page(page_number)?;
        Ok(self.inner.geometry[page_number - 1])
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.inner.fingerprint
    }

    /// The serialized bytes this document was parsed from
    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    /// Fail with `UnsupportedPage` unless `page_number` is in `1..=page_count`
    pub fn check_page(&self, page_number: usize) -> Result<()> {
        if page_number == 0 || page_number > self.page_count() {
            return Err(GalleryError::UnsupportedPage {
                page: page_number,
                page_count: self.page_count(),
            });
        }
        Ok(())
    }

    pub(crate) fn pdf(&self) -> &lopdf::Document {
        &self.inner.pdf
    }

    pub(crate) fn page_id(&self, page_number: usize) -> Result<ObjectId> {
        self.check_page(page_number)?;
        Ok(self.inner.page_ids[page_number - 1])
    }
}

/// Parse a document from bytes
pub fn load(bytes: impl Into<Vec<u8>>) -> Result<Document> {
    Document::from_bytes(bytes.into())
}

/// Parse a document from bytes on the blocking thread pool
pub async fn load_bytes(bytes: Vec<u8>) -> Result<Document> {
    tokio::task::spawn_blocking(move || Document::from_bytes(bytes)).await?
}

/// Read and parse a PDF file
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    load_bytes(bytes).await
}

/// Write serialized PDF bytes to a file
pub async fn save_pdf(bytes: &[u8], path: impl AsRef<Path>) -> Result<()> {
    tokio::fs::write(path.as_ref(), bytes).await?;
    Ok(())
}
