use std::sync::Arc;
use axum::{extract::{Extension, Path, State}, http::StatusCode, Json};
use tracing::{debug, info};

use crate::models::{DocumentResponse, ErrorResponse, UserIdentity};
use crate::AppState;

/// Load a document's saved content and title
pub async fn doc_get(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<DocumentResponse>), (StatusCode, Json<ErrorResponse>)> {
    debug!("Document {} requested by {}", doc_id, identity.user_id);

    match state.documents.get(&doc_id).await {
        Some(doc) => Ok((StatusCode::OK, Json(doc))),
        None => {
            info!("Document '{}' not found", doc_id);
            Err(ErrorResponse::reply(StatusCode::NOT_FOUND, format!("Document '{}' not found", doc_id)))
        }
    }
}
