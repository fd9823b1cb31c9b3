//! Error responses

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pdf_gallery::GalleryError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A failed request, rendered as `{"error": "..."}` with a status chosen
/// from the underlying error
#[derive(Debug)]
pub struct ApiError(pub GalleryError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(GalleryError::InvalidInput(message.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            GalleryError::InvalidInput(_)
            | GalleryError::MalformedDocument(_)
            | GalleryError::EmptyDocument => StatusCode::BAD_REQUEST,
            GalleryError::UnsupportedPage { .. } => StatusCode::NOT_FOUND,
            GalleryError::NothingToExport { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GalleryError::FetchFailure { .. } => StatusCode::BAD_GATEWAY,
            GalleryError::FetchTimeout { .. } | GalleryError::ExportTimeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            GalleryError::RenderFailure { .. }
            | GalleryError::Pdf(_)
            | GalleryError::Io(_)
            | GalleryError::Config(_)
            | GalleryError::TaskJoin(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GalleryError> for ApiError {
    fn from(error: GalleryError) -> Self {
        Self(error)
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::bad_request(format!("Failed to read upload: {}", error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self.0);
        } else {
            log::debug!("Rejected request ({}): {}", status, self.0);
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
