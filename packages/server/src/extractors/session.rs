use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Logged-in clinic session, taken from the `Authorization: Bearer <token>`
/// header.
///
/// Add this as a handler parameter to require a login.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(Session {
            expires_at: claims.expires_at(),
            username: claims.sub,
        })
    }
}
