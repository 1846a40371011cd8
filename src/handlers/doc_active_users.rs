use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json};

use crate::models::{ActiveUsersResponse, ErrorResponse};
use crate::AppState;

/// Current roster of a document channel
pub async fn doc_active_users(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<ActiveUsersResponse>), (StatusCode, Json<ErrorResponse>)> {
    let users = state.registry.roster(&doc_id).await;
    Ok((StatusCode::OK, Json(ActiveUsersResponse { document_id: doc_id, users })))
}
