use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::extractors::session::Session;
use crate::models::auth::{LoginRequest, LoginResponse, MeResponse, validate_login_request};
use crate::state::AppState;
use crate::utils::jwt;

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in to the clinic",
    description = "Checks the configured clinic credential and returns a session token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong username or password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let auth = &state.config.auth;
    let username = payload.username.trim();
    if username != auth.username || payload.password != auth.password {
        return Err(AppError::InvalidCredentials);
    }

    let (token, expires_at) = jwt::sign(username, &auth.jwt_secret, auth.session_hours)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    tracing::info!("Clinic login");

    Ok(Json(LoginResponse {
        token,
        username: username.to_string(),
        expires_at,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current session",
    responses(
        (status = 200, description = "Session details", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(session), fields(username = %session.username))]
pub async fn me(session: Session) -> Json<MeResponse> {
    Json(MeResponse {
        username: session.username,
        expires_at: session.expires_at,
    })
}
