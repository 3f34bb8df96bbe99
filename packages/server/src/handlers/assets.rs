use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::ObjectName;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/storage/{bucket}/{object}",
    tag = "Images",
    operation_id = "serveImage",
    summary = "Download a stored patient image",
    description = "Serves the bytes behind an image URL. Supports ETag-based caching via \
        If-None-Match.",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("object" = String, Path, description = "Object name"),
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn serve_image(
    State(state): State<AppState>,
    Path((bucket, object)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let blobs = state.patients.images().blob_store();
    if bucket != blobs.bucket() {
        return Err(AppError::NotFound("Image not found".into()));
    }

    let name = ObjectName::parse(&object)?;
    let content = blobs.get(&name).await?;

    let etag_value = format!("\"{}\"", hex::encode(Sha256::digest(&content)));
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let mime = mime_guess::from_path(name.as_str()).first_or_octet_stream();

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(content))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
