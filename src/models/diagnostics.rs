use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Server load snapshot
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct DiagnosticsResponse {
    pub n_channels: u32,
    pub n_sessions: u32,
    pub n_documents: u32,
    pub n_cached_identities: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
