use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness/readiness report
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Document channels currently holding at least one session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_channels: Option<usize>,
}
