use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::extractors::session::Session;
use crate::models::upload::{UploadRequest, UploadResponse};
use crate::services::PatientError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/upload",
    tag = "Images",
    operation_id = "uploadImage",
    summary = "Upload a patient image",
    description = "Stores a base64 image and returns its public URL. The image is not linked to \
        any record; pass the URL as `image_url` when creating or updating a patient.",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 500, description = "Image could not be stored (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session, payload), fields(user = %session.username))]
pub async fn upload_image(
    session: Session,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let payload = payload.into_payload()?;
    payload.validate()?;

    let url = state
        .patients
        .images()
        .store(&payload)
        .await
        .map_err(PatientError::from)?;

    Ok(Json(UploadResponse { url }))
}
