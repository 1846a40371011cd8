pub mod health;
pub mod doc_get;
pub mod doc_update;
pub mod doc_active_users;
pub mod diagnostics;

pub use health::*;
pub use doc_get::*;
pub use doc_update::*;
pub use doc_active_users::*;
pub use diagnostics::*;

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::models::{DocumentResponse, HealthResponse};
    use crate::services::auth_service::issue_token;
    use crate::{build_app, AppState};

    const SECRET: &str = "handler-secret";

    fn app() -> Router {
        let config = Config {
            auth_jwt_secret: Some(SECRET.to_string()),
            ..Config::default()
        };
        build_app(AppState::new(config))
    }

    fn bearer() -> String {
        let token = issue_token(SECRET, "user-1", Some("Asha"), Duration::from_secs(600)).unwrap();
        format!("Bearer {}", token)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let res = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let health: HealthResponse = body_json(res.into_body()).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.message, "collab-sync is running");
    }

    #[tokio::test]
    async fn test_health_names_configured_service() {
        let config = Config {
            service_name: "notes-sync".to_string(),
            ..Config::default()
        };
        let res = build_app(AppState::new(config))
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: HealthResponse = body_json(res.into_body()).await;
        assert_eq!(health.message, "notes-sync is running");
    }

    #[tokio::test]
    async fn test_ready_reports_open_channels() {
        let res = app()
            .oneshot(Request::get("/api/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: HealthResponse = body_json(res.into_body()).await;
        assert_eq!(health.open_channels, Some(0));
    }

    #[tokio::test]
    async fn test_documents_require_credential() {
        let res = app()
            .oneshot(Request::get("/api/v1/documents/doc1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app()
            .oneshot(
                Request::get("/api/v1/documents/doc1")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_secret_is_server_error() {
        let app = build_app(AppState::new(Config::default()));
        let res = app
            .oneshot(
                Request::get("/api/v1/documents/doc1")
                    .header(header::AUTHORIZATION, bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let app = app();

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/documents/doc1").header(header::AUTHORIZATION, bearer()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .clone()
            .oneshot(
                Request::put("/api/v1/documents/doc1")
                    .header(header::AUTHORIZATION, bearer())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"content":"<p>Hello</p>","title":"Draft","isManualSave":true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let saved: DocumentResponse = body_json(res.into_body()).await;
        assert_eq!(saved.version, 1);
        assert!(saved.last_manual_save.is_some());

        let res = app
            .oneshot(Request::get("/api/v1/documents/doc1").header(header::AUTHORIZATION, bearer()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let loaded: DocumentResponse = body_json(res.into_body()).await;
        assert_eq!(loaded.content, "<p>Hello</p>");
        assert_eq!(loaded.title, "Draft");
    }

    #[tokio::test]
    async fn test_empty_save_rejected() {
        let res = app()
            .oneshot(
                Request::put("/api/v1/documents/doc1")
                    .header(header::AUTHORIZATION, bearer())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"isManualSave":false}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_active_users_empty_document() {
        let res = app()
            .oneshot(
                Request::get("/api/v1/documents/doc1/active-users")
                    .header(header::AUTHORIZATION, bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(res.into_body()).await;
        assert_eq!(body["documentId"], "doc1");
        assert_eq!(body["users"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_diagnostics_counts() {
        let res = app()
            .oneshot(
                Request::get("/api/v1/diagnostics")
                    .header(header::AUTHORIZATION, bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(res.into_body()).await;
        assert_eq!(body["n_channels"], 0);
        assert_eq!(body["n_sessions"], 0);
        assert_eq!(body["n_cached_identities"], 1);
    }
}
