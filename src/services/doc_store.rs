use std::collections::HashMap;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::models::{DocumentResponse, DocumentUpdateRequest};

const DEFAULT_TITLE: &str = "Untitled Document";

#[derive(Debug, Clone)]
struct StoredDocument {
    title: String,
    content: String,
    version: u64,
    updated_at: DateTime<Utc>,
    last_manual_save: Option<DateTime<Utc>>,
}

impl StoredDocument {
    fn to_response(&self, id: &str) -> DocumentResponse {
        DocumentResponse {
            id: id.to_string(),
            title: self.title.clone(),
            content: self.content.clone(),
            version: self.version,
            updated_at: self.updated_at,
            last_manual_save: self.last_manual_save,
        }
    }
}

/// Process-resident document storage backing the save/load API.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: RwLock<HashMap<String, StoredDocument>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, doc_id: &str) -> Option<DocumentResponse> {
        self.docs.read().await.get(doc_id).map(|d| d.to_response(doc_id))
    }

    /// Apply a save. Absent fields keep their stored value; a missing
    /// document is created with an empty body and the default title.
    pub async fn update(&self, doc_id: &str, request: DocumentUpdateRequest) -> DocumentResponse {
        let now = Utc::now();
        let mut docs = self.docs.write().await;
        let doc = docs.entry(doc_id.to_string()).or_insert_with(|| StoredDocument {
            title: DEFAULT_TITLE.to_string(),
            content: String::new(),
            version: 0,
            updated_at: now,
            last_manual_save: None,
        });

        if let Some(content) = request.content {
            doc.content = content;
        }
        if let Some(title) = request.title {
            doc.title = title;
        }
        doc.version += 1;
        doc.updated_at = now;
        if request.is_manual_save {
            doc.last_manual_save = Some(now);
        }

        info!(
            "Document {} saved (version {}, manual: {})",
            doc_id, doc.version, request.is_manual_save
        );
        doc.to_response(doc_id)
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_creates_document() {
        let store = DocumentStore::new();
        assert!(store.get("doc1").await.is_none());

        let saved = store
            .update("doc1", DocumentUpdateRequest { content: Some("Hello".into()), title: None, is_manual_save: false })
            .await;
        assert_eq!(saved.title, DEFAULT_TITLE);
        assert_eq!(saved.content, "Hello");
        assert_eq!(saved.version, 1);
        assert!(saved.last_manual_save.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_partial_updates_keep_other_fields() {
        let store = DocumentStore::new();
        store
            .update("doc1", DocumentUpdateRequest { content: Some("Body".into()), title: Some("Draft".into()), is_manual_save: false })
            .await;
        let saved = store
            .update("doc1", DocumentUpdateRequest { content: None, title: Some("Final".into()), is_manual_save: true })
            .await;

        assert_eq!(saved.content, "Body");
        assert_eq!(saved.title, "Final");
        assert_eq!(saved.version, 2);
        assert!(saved.last_manual_save.is_some());
        assert_eq!(store.get("doc1").await.unwrap(), saved);
    }
}
