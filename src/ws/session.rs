use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ActiveUser, UserIdentity};

/// One client's attachment to a document channel.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub document_id: String,
    pub identity: UserIdentity,
    pub attached_at: DateTime<Utc>,
}

impl Session {
    pub fn new(document_id: impl Into<String>, id: Uuid, identity: UserIdentity) -> Self {
        Self {
            id,
            document_id: document_id.into(),
            identity,
            attached_at: Utc::now(),
        }
    }

    pub fn as_active_user(&self) -> ActiveUser {
        ActiveUser {
            session_id: self.id,
            user_id: self.identity.user_id.clone(),
            name: self.identity.display_name(),
            attached_at: self.attached_at,
        }
    }
}
