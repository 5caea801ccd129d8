//! Route table.

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState, cors_enabled: bool) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/batch",
            post(handlers::create_batch)
                .get(handlers::get_batch)
                .delete(handlers::cancel_batch),
        )
        .route(
            "/documents/:document_id/reclassify",
            post(handlers::reclassify_document),
        )
        .with_state(state);

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(Any);
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
}
