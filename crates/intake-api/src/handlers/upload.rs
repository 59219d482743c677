//! `POST /upload`

use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::Json;
use chrono::Utc;
use intake_core::UploadResult;
use serde::Deserialize;

use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::{content_length, is_multipart, raw_body_upload, spool_multipart_file};

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    /// Filename hint for raw-body uploads
    pub filename: Option<String>,
}

/// Accept a multipart `file` field or a raw body with `?filename=`.
///
/// Returns the storage locator and whether post-processing still has to be
/// enqueued. A request with no file returns a null locator.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    request: Request,
) -> Result<Json<UploadResult>, HttpAppError> {
    let received_at = Utc::now();

    let decoded = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state).await?;
        spool_multipart_file(multipart).await?
    } else {
        let size_hint = content_length(request.headers());
        raw_body_upload(request.into_body(), params.filename, size_hint)
    };

    let result = state
        .coordinator
        .handle(decoded.request, received_at)
        .await?;

    Ok(Json(result))
}
