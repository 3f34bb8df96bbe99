use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::extractors::session::Session;
use crate::models::patient::{
    CreatePatientRequest, PatientListQuery, PatientResponse, UpdatePatientRequest,
};
use crate::state::AppState;
use crate::utils::csv;

/// Ids are opaque to clients; anything that is not one of ours is simply
/// not found.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Patient record not found".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients",
    tag = "Patients",
    operation_id = "listPatients",
    summary = "List patient records",
    description = "Returns all records, newest first. With `search`, only records whose name, \
        parent name or OP number contains the term (case-insensitive), or whose age contains it \
        as a decimal substring. A blank term returns everything.",
    params(PatientListQuery),
    responses(
        (status = 200, description = "Patient records", body = Vec<PatientResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session, query), fields(user = %session.username, search = query.search.as_deref()))]
pub async fn list_patients(
    session: Session,
    State(state): State<AppState>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<PatientResponse>>, AppError> {
    let records = match query.search.as_deref() {
        Some(term) => state.patients.search(term).await?,
        None => state.patients.list().await?,
    };

    Ok(Json(records.into_iter().map(PatientResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/patients",
    tag = "Patients",
    operation_id = "createPatient",
    summary = "Create a patient record",
    description = "Creates a record. `name`, `age` and `contact_details` are required. An inline \
        `image` is stored before the record is written; if the write fails the image is removed \
        again. `image_url` may instead link an image from `POST /api/v1/upload`.",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created", body = PatientResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 500, description = "Image could not be stored (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session, payload), fields(user = %session.username))]
pub async fn create_patient(
    session: Session,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePatientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (draft, image) = payload.into_parts()?;
    let created = state.patients.create(draft, image).await?;

    Ok((StatusCode::CREATED, Json(PatientResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    tag = "Patients",
    operation_id = "getPatient",
    summary = "Get a patient record",
    params(("id" = String, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient record", body = PatientResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Patient not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session), fields(user = %session.username))]
pub async fn get_patient(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientResponse>, AppError> {
    let id = parse_id(&id)?;
    let record = state.patients.get(id).await?;

    Ok(Json(PatientResponse::from(record)))
}

#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    tag = "Patients",
    operation_id = "updatePatient",
    summary = "Update a patient record",
    description = "Replaces the record's fields. A new inline `image` is stored first; the \
        previous image is removed only after the record is saved. `image_url: null` removes the \
        image, omitting `image_url` keeps it.",
    params(("id" = String, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = PatientResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Patient not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Image could not be stored (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session, payload), fields(user = %session.username))]
pub async fn update_patient(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdatePatientRequest>,
) -> Result<Json<PatientResponse>, AppError> {
    let id = parse_id(&id)?;
    let (draft, image) = payload.into_parts()?;
    let updated = state.patients.update(id, draft, image).await?;

    Ok(Json(PatientResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/patients/{id}",
    tag = "Patients",
    operation_id = "deletePatient",
    summary = "Delete a patient record",
    description = "Deletes the record and then its image. Returns the deleted record.",
    params(("id" = String, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient deleted", body = PatientResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Patient not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session), fields(user = %session.username))]
pub async fn delete_patient(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientResponse>, AppError> {
    let id = parse_id(&id)?;
    let deleted = state.patients.delete(id).await?;

    Ok(Json(PatientResponse::from(deleted)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/export",
    tag = "Patients",
    operation_id = "exportPatients",
    summary = "Export all patient records as CSV",
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, session), fields(user = %session.username))]
pub async fn export_patients(
    session: Session,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.patients.list().await?;
    let body = csv::patients_to_csv(&records);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", csv::EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}
