use std::sync::Arc;
use axum::{extract::{Extension, Path, State}, http::StatusCode, Json};
use tracing::info;

use crate::models::{DocumentResponse, DocumentUpdateRequest, ErrorResponse, UserIdentity};
use crate::AppState;

/// Save a document. Called by manual saves and by the debounced autosave.
pub async fn doc_update(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(doc_id): Path<String>,
    Json(request): Json<DocumentUpdateRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), (StatusCode, Json<ErrorResponse>)> {
    if request.content.is_none() && request.title.is_none() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Nothing to save: provide content and/or title"));
    }

    info!(
        "Saving document {} for {} (manual: {})",
        doc_id, identity.user_id, request.is_manual_save
    );
    let saved = state.documents.update(&doc_id, request).await;
    Ok((StatusCode::OK, Json(saved)))
}
