use std::fmt;

use serde::{Deserialize, Serialize};

/// Error body returned by the ledger HTTP API on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainApiError {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ChainErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub what: String,
    #[serde(default)]
    pub details: Vec<ChainErrorDetailEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainErrorDetailEntry {
    pub message: String,
}

impl fmt::Display for ChainApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(detail) = &self.error else {
            return write!(f, "{}: {}", self.code, self.message);
        };

        let what = if detail.what.is_empty() {
            self.message.as_str()
        } else {
            detail.what.as_str()
        };
        match detail.details.first() {
            Some(entry) => write!(f, "{}: {} ({})", self.code, what, entry.message),
            None => write!(f, "{}: {}", self.code, what),
        }
    }
}
