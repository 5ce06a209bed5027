use std::time::Duration;

use thiserror::Error;

/// Failure reaching or decoding the ledger query API.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("ledger request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ledger api returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("ledger request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid ledger response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found, login first")]
    NoSession,
    /// Wallet or SSO provider refused the login; passed through untouched.
    #[error(transparent)]
    Login(anyhow::Error),
    /// Broadcast failure from the signing session; passed through untouched.
    #[error(transparent)]
    Transact(anyhow::Error),
    #[error("sso login could not be completed: {0}")]
    Sso(String),
    #[error("session storage failed: {0}")]
    Storage(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown network '{0}', expected 'mainnet' or 'testnet'")]
    UnknownNetwork(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("failed to parse config file: {0}")]
    File(#[from] toml::de::Error),
}
