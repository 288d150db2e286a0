pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::sensors::SensorService;
use handlers::ApiDoc;

pub fn router(service: SensorService) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/v1/sensors",
            get(handlers::list_sensors).post(handlers::create_sensor),
        )
        .route(
            "/api/v1/sensors/{id}",
            get(handlers::get_sensor)
                .put(handlers::update_sensor)
                .delete(handlers::delete_sensor),
        )
        .with_state(service)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
}
