use crate::{
    handlers::{diagnostics, doc_active_users, doc_get, doc_update, health_check, ready_check},
    routes::auth_middleware::auth_middleware,
    AppState,
};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/v1/documents/:doc_id", get(doc_get).put(doc_update))
        .route("/v1/documents/:doc_id/active-users", get(doc_active_users))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)); // Applies to all routes added above

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(protected)
}
