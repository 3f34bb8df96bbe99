use axum::routing::{get, post};
use utoipa_axum::router::OpenApiRouter;

use super::only;
use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/patients", patient_routes())
        .route(
            "/upload",
            only(post(handlers::upload::upload_image), "POST"),
        )
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .route("/login", only(post(handlers::auth::login), "POST"))
        .route("/me", only(get(handlers::auth::me), "GET, HEAD"))
}

fn patient_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .route(
            "/",
            only(
                get(handlers::patient::list_patients).post(handlers::patient::create_patient),
                "GET, HEAD, POST",
            ),
        )
        .route(
            "/export",
            only(get(handlers::patient::export_patients), "GET, HEAD"),
        )
        .route(
            "/{id}",
            only(
                get(handlers::patient::get_patient)
                    .put(handlers::patient::update_patient)
                    .delete(handlers::patient::delete_patient),
                "GET, HEAD, PUT, DELETE",
            ),
        )
}
