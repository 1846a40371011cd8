use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::client::transport::BoxFuture;
use crate::error::SyncError;
use crate::models::{DocumentResponse, DocumentUpdateRequest};

/// Saved state of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub title: String,
    pub content: String,
}

/// Durable storage for one document, supplied by the embedding application.
pub trait DocumentPersistence: Send + Sync {
    fn save(&self, content: String, is_manual: bool) -> BoxFuture<'static, Result<(), SyncError>>;

    fn save_title(&self, title: String) -> BoxFuture<'static, Result<(), SyncError>>;

    /// `None` when nothing was saved yet.
    fn load(&self) -> BoxFuture<'static, Result<Option<DocumentSnapshot>, SyncError>>;
}

/// Persists through the server's `/api/v1/documents/:doc_id` endpoints.
#[derive(Clone)]
pub struct HttpPersistence {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpPersistence {
    pub fn new(base_url: &str, document_id: &str, token: impl Into<String>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let mut endpoint = url::Url::parse(base_url)?;
        endpoint
            .path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(format!("{} cannot be a base", base_url)))?
            .pop_if_empty()
            .extend(["api", "v1", "documents", document_id]);

        Ok(Self { client, endpoint: endpoint.to_string(), token: token.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn put(&self, body: DocumentUpdateRequest) -> BoxFuture<'static, Result<(), SyncError>> {
        let request = self.client.put(&self.endpoint).bearer_auth(&self.token).json(&body);
        Box::pin(async move {
            let response = request.send().await?;
            response.error_for_status()?;
            Ok(())
        })
    }
}

impl DocumentPersistence for HttpPersistence {
    fn save(&self, content: String, is_manual: bool) -> BoxFuture<'static, Result<(), SyncError>> {
        debug!("Saving content ({} bytes, manual: {})", content.len(), is_manual);
        self.put(DocumentUpdateRequest { content: Some(content), title: None, is_manual_save: is_manual })
    }

    fn save_title(&self, title: String) -> BoxFuture<'static, Result<(), SyncError>> {
        self.put(DocumentUpdateRequest { content: None, title: Some(title), is_manual_save: false })
    }

    fn load(&self) -> BoxFuture<'static, Result<Option<DocumentSnapshot>, SyncError>> {
        let request = self.client.get(&self.endpoint).bearer_auth(&self.token);
        Box::pin(async move {
            let response = request.send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let doc: DocumentResponse = response.error_for_status()?.json().await?;
            Ok(Some(DocumentSnapshot { title: doc.title, content: doc.content }))
        })
    }
}
