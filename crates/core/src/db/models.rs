use serde::{Deserialize, Serialize};

/// Bookkeeping for one parity batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParityRunRecord {
    pub started_at: String,
    pub finished_at: String,
    /// SHA-256 of the hook registry used for the run, if any.
    pub hooks_hash: Option<String>,
    /// Backend name, or `None` for source-only runs.
    pub backend: Option<String>,
    pub total: u32,
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
}
