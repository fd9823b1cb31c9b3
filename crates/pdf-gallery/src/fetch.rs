//! Remote resource fetching
//!
//! Every fetch is bounded by a timeout covering the whole request, body
//! included, and fails distinctly with `FetchTimeout` when it runs out.

use crate::options::FetchConfig;
use crate::types::*;
use async_trait::async_trait;
use std::time::Duration;

/// Fetches PDFs for upload intake and images for export
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a PDF, validating its content type and size
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch an image for export
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_pdf_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: config.timeout(),
            max_pdf_bytes: config.max_pdf_bytes,
        }
    }

    async fn get(&self, url: &str, accept: &str, limit: Option<u64>, require_pdf: bool) -> Result<Vec<u8>> {
        let request = async {
            let mut response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, accept)
                .send()
                .await
                .map_err(|e| fetch_failure(url, e))?;

            check_status(url, response.status().as_u16())?;

            if require_pdf {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok());
                check_pdf_content_type(url, content_type)?;
            }
            if let (Some(limit), Some(declared)) = (limit, response.content_length()) {
                check_size(url, declared, limit)?;
            }

            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await.map_err(|e| fetch_failure(url, e))? {
                body.extend_from_slice(&chunk);
                if let Some(limit) = limit {
                    check_size(url, body.len() as u64, limit)?;
                }
            }
            Ok(body)
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GalleryError::FetchTimeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(url, "application/pdf", Some(self.max_pdf_bytes), true)
            .await?;
        log::debug!("Fetched {} bytes of PDF from {}", bytes.len(), url);
        Ok(bytes)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.get(url, "image/*", None, false).await
    }
}

fn fetch_failure(url: &str, error: reqwest::Error) -> GalleryError {
    GalleryError::FetchFailure {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

/// Map an HTTP status to a fetch error
pub(crate) fn check_status(url: &str, status: u16) -> Result<()> {
    let reason = match status {
        200..=299 => return Ok(()),
        404 => "not found".to_string(),
        401 | 403 => "access restricted".to_string(),
        other => format!("server responded with status {}", other),
    };
    Err(GalleryError::FetchFailure {
        url: url.to_string(),
        reason,
    })
}

pub(crate) fn check_pdf_content_type(url: &str, content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(value) if value.to_ascii_lowercase().contains("application/pdf") => Ok(()),
        other => Err(GalleryError::FetchFailure {
            url: url.to_string(),
            reason: format!(
                "expected a PDF but got content type {}",
                other.unwrap_or("(none)")
            ),
        }),
    }
}

pub(crate) fn check_size(url: &str, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(GalleryError::FetchFailure {
            url: url.to_string(),
            reason: format!("resource exceeds the {} byte limit", limit),
        });
    }
    Ok(())
}

/// Whether a source string names a remote resource rather than a local path
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
