use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::ActiveUser;

/// Body of `PUT /api/v1/documents/:doc_id`
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdateRequest {
    pub content: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub is_manual_save: bool,
}

/// Stored document state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub last_manual_save: Option<DateTime<Utc>>,
}

/// Roster of a document channel
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsersResponse {
    pub document_id: String,
    pub users: Vec<ActiveUser>,
}
