use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Load a saved document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{doc_id}",
    params(("doc_id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Saved document", body = DocumentResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_get_doc() {}

/// Save document content and/or title
#[utoipa::path(
    put,
    path = "/api/v1/documents/{doc_id}",
    params(("doc_id" = String, Path, description = "Document identifier")),
    request_body = DocumentUpdateRequest,
    responses(
        (status = 200, description = "Document saved", body = DocumentResponse),
        (status = 400, description = "Nothing to save", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_update_doc() {}

/// Sessions currently attached to a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{doc_id}/active-users",
    params(("doc_id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Current roster", body = ActiveUsersResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_active_users_doc() {}

/// Channel, session and host load figures
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Load snapshot", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        doc_get_doc,
        doc_update_doc,
        doc_active_users_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, ErrorResponse, DocumentResponse, DocumentUpdateRequest, ActiveUsersResponse, ActiveUser, DiagnosticsResponse)
    ),
    tags(
        (name = "documents", description = "Document save/load and presence")
    )
)]
pub struct ApiDoc;
