use std::sync::Arc;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use tracing::{debug, error, warn};

use crate::error::SyncError;
use crate::models::ErrorResponse;
use crate::services::auth_service::get_auth_token;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {

    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(e) => {
            debug!("No credential on {}: {}", req.uri().path(), e);
            return Err(ErrorResponse::reply(StatusCode::UNAUTHORIZED, e));
        }
    };

    // 2. A server without a secret can't validate anything
    if !state.identities.has_secret() {
        error!("Auth JWT secret not configured");
        return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Authentication not configured"));
    }

    // 3. Validate and resolve the identity
    let identity = match state.identities.resolve(&token) {
        Ok(identity) => identity,
        Err(e @ (SyncError::Unauthorized(_) | SyncError::MissingCredential)) => {
            warn!("Credential rejected on {}: {}", req.uri().path(), e);
            return Err(ErrorResponse::reply(StatusCode::UNAUTHORIZED, e.to_string()));
        }
        Err(e) => {
            error!("Failed to resolve identity: {}", e);
            return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    // 4. Hand the identity to downstream handlers
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
