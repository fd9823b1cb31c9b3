//! Gallery API endpoints
//!
//! - GET  /api/presets - quality presets offered to clients
//! - POST /api/preview - render one page of an uploaded PDF
//! - POST /api/export  - assemble images into a downloadable PDF
//! - GET  /api/image   - fetch a remote image and re-encode it at a tier size

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{HeaderValue, header};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use pdf_gallery::{ExportRequest, ImageFormat, QualityPreset, RasterResult, RenderTarget};

/// Rendered pages are addressed by content, so they never change
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const LONG_CACHE_CONTROL: &str = "public, max-age=31536000";

pub const SKIPPED_ENTRIES_HEADER: &str = "x-skipped-entries";

const DEFAULT_PREVIEW_QUALITY: u8 = 90;
const DEFAULT_IMAGE_QUALITY: u8 = 75;

/// Create the gallery router
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config().fetch.max_pdf_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/presets", get(list_presets))
        .route("/api/preview", post(preview_page))
        .route("/api/export", post(export_pdf))
        .route("/api/image", get(process_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PresetInfo {
    pub name: String,
    pub scale: u32,
    pub dpi: u32,
}

/// GET /api/presets
async fn list_presets() -> Json<Vec<PresetInfo>> {
    Json(
        QualityPreset::ALL
            .iter()
            .map(|preset| PresetInfo {
                name: preset.name().to_string(),
                scale: preset.scale(),
                dpi: preset.dpi(),
            })
            .collect(),
    )
}

/// POST /api/preview
///
/// Multipart fields: `pdf` (file), `page` (1-indexed), and optionally
/// `format` (jpeg|png, default png) and `quality` (0-100, default 90).
async fn preview_page(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut pdf = None;
    let mut page = None;
    let mut format = ImageFormat::Png;
    let mut quality = DEFAULT_PREVIEW_QUALITY;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pdf" => pdf = Some(field.bytes().await?),
            "page" => {
                let text = field.text().await?;
                page = Some(text.trim().parse::<usize>().map_err(|_| {
                    ApiError::bad_request(format!("Invalid page number: {}", text))
                })?);
            }
            "format" => format = field.text().await?.trim().parse()?,
            "quality" => {
                let text = field.text().await?;
                quality = text
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("Invalid quality: {}", text)))?;
            }
            other => log::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (Some(pdf), Some(page)) = (pdf, page) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let document = pdf_gallery::load_bytes(pdf.to_vec()).await?;
    let target = state.adjust_target(RenderTarget::from_quality(quality, format));
    let (preview, source) = state
        .generator()
        .preview_single(&document, page, target)
        .await?;

    log::debug!(
        "Preview of page {} of {} ({:?})",
        page,
        document.fingerprint(),
        source
    );

    match preview.image {
        Some(image) => Ok(image_response(&image, IMMUTABLE_CACHE_CONTROL)),
        None => Err(ApiError::bad_request("Page produced no image")),
    }
}

/// POST /api/export
async fn export_pdf(
    State(state): State<AppState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let outcome = pdf_gallery::export(request, state.fetcher(), &state.config().export).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        outcome.filename.replace(['"', '\\', '\r', '\n'], "_")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"gallery.pdf\""));

    let mut response = Response::new(Body::from(outcome.bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        SKIPPED_ENTRIES_HEADER,
        HeaderValue::from(outcome.skipped.len()),
    );
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ImageQuery {
    url: Option<String>,
    quality: Option<u8>,
    format: Option<String>,
}

/// GET /api/image?url=&quality=&format=
async fn process_image(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let url = query
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing image URL"))?;
    let format = match query.format.as_deref() {
        Some(format) => format.parse()?,
        None => ImageFormat::Jpeg,
    };
    let quality = query.quality.unwrap_or(DEFAULT_IMAGE_QUALITY);

    let bytes = state.fetcher().fetch_image(&url).await?;

    let target = RenderTarget::from_quality(quality, format)
        .with_reduced_palette(format == ImageFormat::Png);
    let result =
        tokio::task::spawn_blocking(move || pdf_gallery::render::reencode(&bytes, &target))
            .await
            .map_err(pdf_gallery::GalleryError::from)??;

    Ok(image_response(&result, LONG_CACHE_CONTROL))
}

fn image_response(image: &RasterResult, cache_control: &'static str) -> Response {
    let mut response = Response::new(Body::from(image.bytes.clone()));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image.format.mime_type()),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(image.bytes.len()));
    response
}
