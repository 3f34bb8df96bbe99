pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Patient Records API",
        version = "1.0.0",
        description = "Patient records and photos for a small pediatric dental clinic"
    ),
    paths(
        handlers::auth::login,
        handlers::auth::me,
        handlers::patient::list_patients,
        handlers::patient::create_patient,
        handlers::patient::get_patient,
        handlers::patient::update_patient,
        handlers::patient::delete_patient,
        handlers::patient::export_patients,
        handlers::upload::upload_image,
        handlers::assets::serve_image,
    ),
    tags(
        (name = "Auth", description = "Clinic login and session"),
        (name = "Patients", description = "Patient record lifecycle"),
        (name = "Images", description = "Patient photo upload and download"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Room for base64 expansion of the largest accepted image plus the
/// remaining JSON fields.
fn body_limit(max_image_size: u64) -> DefaultBodyLimit {
    let max = max_image_size.saturating_mul(4).div_ceil(3) + 64 * 1024;
    DefaultBodyLimit::max(usize::try_from(max).unwrap_or(usize::MAX))
}

fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(Duration::from_secs(config.max_age)),
    )
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .merge(routes::storage_routes())
        .split_for_parts();

    let router = router
        .layer(body_limit(state.config.storage.max_image_size))
        .with_state(state.clone())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api));

    match cors_layer(&state.config.server.cors) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
