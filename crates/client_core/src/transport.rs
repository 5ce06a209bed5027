//! Ledger table reads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::AccountName,
    error::ChainApiError,
    protocol::{GetTableRowsRequest, GetTableRowsResponse, TableName},
};
use tracing::debug;

use crate::error::TransportError;

const GET_TABLE_ROWS_PATH: &str = "/v1/chain/get_table_rows";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub code: AccountName,
    pub scope: String,
    pub table: TableName,
    /// Closed `[key, key]` bound on the primary key.
    pub key: Option<AccountName>,
    pub limit: u32,
}

impl TableQuery {
    /// Query scoped to the contract itself, returning at most one row.
    pub fn new(code: &AccountName, table: TableName) -> Self {
        Self {
            code: code.clone(),
            scope: code.as_str().to_string(),
            table,
            key: None,
            limit: 1,
        }
    }

    pub fn with_key(mut self, key: &AccountName) -> Self {
        self.key = Some(key.clone());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn to_request(&self) -> GetTableRowsRequest {
        let bound = self.key.as_ref().map(|key| key.as_str().to_string());
        GetTableRowsRequest {
            code: self.code.as_str().to_string(),
            scope: self.scope.clone(),
            table: self.table.as_str().to_string(),
            lower_bound: bound.clone(),
            upper_bound: bound,
            limit: self.limit,
            json: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRows {
    pub rows: Vec<Value>,
    pub more: bool,
}

/// Reads contract table rows. Implementations must not retry.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_table_rows(&self, query: &TableQuery) -> Result<TableRows, TransportError>;
}

pub struct HttpChainReader {
    http: Client,
    api_url: String,
}

impl HttpChainReader {
    pub fn new(api_url: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(http, api_url))
    }

    pub fn with_client(http: Client, api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl ChainReader for HttpChainReader {
    async fn get_table_rows(&self, query: &TableQuery) -> Result<TableRows, TransportError> {
        let url = format!("{}{GET_TABLE_ROWS_PATH}", self.api_url);
        let response = self
            .http
            .post(&url)
            .json(&query.to_request())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ChainApiError>(&body) {
                Ok(api_error) => api_error.to_string(),
                Err(_) => body,
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: GetTableRowsResponse = response
            .json()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        debug!(
            table = query.table.as_str(),
            rows = body.rows.len(),
            more = body.more,
            "ledger: table rows fetched"
        );

        Ok(TableRows {
            rows: body.rows,
            more: body.more,
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
