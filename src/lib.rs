//! Real-time collaborative document sync.
//!
//! Server side ([`ws`]): a per-document channel registry and a broadcast router
//! behind an axum WebSocket endpoint, plus a small REST surface for saving and
//! loading documents.
//!
//! Client side ([`client`]): the reconciler, debounced emitter and reconnection
//! supervisor that keep one editing view in step with its document channel,
//! driven by a single [`client::CollabSession`] actor.

pub mod client;
pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod ws;

use std::sync::Arc;
use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::services::auth_service::IdentityResolver;
use crate::services::doc_store::DocumentStore;
use crate::ws::registry::ConnectionRegistry;
use crate::ws::router::BroadcastRouter;

pub use error::SyncError;

/// Shared server state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ConnectionRegistry>,
    pub router: BroadcastRouter,
    pub documents: DocumentStore,
    pub identities: IdentityResolver,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new(config.broadcast_capacity));
        let router = BroadcastRouter::new(registry.clone());
        let identities = IdentityResolver::new(config.auth_jwt_secret.clone(), config.identity_cache_ttl());
        Arc::new(Self {
            config,
            registry,
            router,
            documents: DocumentStore::new(),
            identities,
        })
    }
}

/// Assemble the full HTTP + WebSocket application.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/document/:doc_id", get(ws::handler::websocket_handler))
        .nest("/api", routes::create_api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|o| match HeaderValue::from_str(&o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
