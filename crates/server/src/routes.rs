//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route(
            "/upload",
            post(handlers::upload_site).fallback(handlers::upload_method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes()));

    let mut router = Router::new().merge(upload_routes);

    // Off by default: the path would shadow a tenant file on every host.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        // Everything else is site content, keyed by the Host header.
        .fallback(handlers::serve_site)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
