//! HTTP router.
//!
//! JSON endpoints are nested under `/api/`; signed object fetches live at
//! `/objects/*key`. When a UI build directory is configured every other
//! path is served from it, with `index.html` as the SPA fallback.
//!
//! Layers (outermost → innermost): CORS → access log → body limit.

use std::path::Path;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::{ApiContext, MAX_BODY_BYTES};

/// Build the full application router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/login", post(endpoints::auth::login))
        .route("/users/:user_id", get(endpoints::auth::get_user))
        .route("/generate-report", post(endpoints::reports::generate))
        .route("/predict", post(endpoints::predictions::predict))
        .route("/search-patients", get(endpoints::patients::search))
        .route("/patient/:id", get(endpoints::patients::get))
        .route("/update-patient", put(endpoints::patients::update))
        .route("/create-patient", post(endpoints::patients::create))
        .route(
            "/create-patient-with-image",
            post(endpoints::patients::create_with_image),
        )
        .route("/upload-patient-image", post(endpoints::images::upload))
        .route(
            "/download-patient-image",
            get(endpoints::images::download),
        );

    let mut app = Router::new()
        .nest("/api", api)
        .route("/objects/*key", get(endpoints::images::serve_object))
        .with_state(ctx);

    if let Some(dir) = static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(CorsLayer::permissive())
}
