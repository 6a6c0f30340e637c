//! Per-benchmark script and configuration.

use benchyard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `secrets` table.
///
/// Not serialised to API clients in full: `env` and `vars` may hold
/// credentials.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Secret {
    pub id: DbId,
    pub benchmark_id: DbId,
    /// File name of the packaged script under the secret's storage directory.
    pub script: Option<String>,
    /// External script descriptor. Not executed.
    pub script_link: Option<serde_json::Value>,
    #[serde(skip_serializing)]
    pub env: Option<serde_json::Value>,
    #[serde(skip_serializing)]
    pub vars: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Secret {
    /// The packaged script file name, if one was uploaded.
    pub fn packaged_script(&self) -> Option<&str> {
        self.script.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// DTO for creating a secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSecret {
    pub benchmark_id: DbId,
    pub script: Option<String>,
    pub script_link: Option<serde_json::Value>,
    pub env: Option<serde_json::Value>,
    pub vars: Option<serde_json::Value>,
}
