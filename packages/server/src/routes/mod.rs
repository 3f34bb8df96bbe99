mod v1;

use axum::routing::{MethodRouter, get};
use utoipa_axum::router::OpenApiRouter;

use crate::error::AppError;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}

/// Public image URLs: `{public_base_url}/{bucket}/{object}`.
pub fn storage_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().route(
        "/storage/{bucket}/{object}",
        only(get(handlers::assets::serve_image), "GET, HEAD"),
    )
}

/// Answer any verb the route does not handle with 405 and an `Allow` header.
pub(crate) fn only(
    methods: MethodRouter<AppState>,
    allow: &'static str,
) -> MethodRouter<AppState> {
    methods.fallback(move || async move { AppError::MethodNotAllowed(allow) })
}
