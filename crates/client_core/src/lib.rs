use std::{sync::Arc, time::Duration};

use serde::de::DeserializeOwned;
use shared::{
    domain::AccountName,
    protocol::{AdopterRow, ConfigRow, StatsRow, TableName},
};
use tracing::{debug, warn};

pub mod actions;
pub mod config;
pub mod error;
pub mod rewards;
mod session_manager;
mod slot;
pub mod transport;
pub mod types;

pub use actions::{ActionBuilder, ConfigParams};
pub use config::{load_settings, NetworkConfig, SessionSettings};
pub use error::{ConfigError, SessionError, TransportError};
pub use session_manager::{
    ActiveSession, ChainSession, MissingSsoProvider, MissingWalletBackend, Navigator,
    NoopNavigator, SessionManager, SessionState, SsoCallback, SsoProvider, TransactOptions,
    WalletBackend,
};
pub use slot::SlotReader;
pub use transport::{ChainReader, HttpChainReader, TableQuery, TableRows};
pub use types::{ContractConfig, GlobalStats, InviteRecord};

use crate::slot::Slot;

/// Reads the invite contract's tables into three observable slots and builds
/// its actions. One instance per network binding.
pub struct ContractClient {
    contract: AccountName,
    request_timeout: Duration,
    reader: Arc<dyn ChainReader>,
    actions: ActionBuilder,
    invite_data: Slot<InviteRecord>,
    global_stats: Slot<GlobalStats>,
    contract_config: Slot<ContractConfig>,
}

impl ContractClient {
    pub fn new(network: &NetworkConfig) -> Result<Self, TransportError> {
        let reader = HttpChainReader::new(network.api_url.clone(), network.request_timeout)?;
        Ok(Self::with_reader(
            network.contract_account.clone(),
            network.request_timeout,
            Arc::new(reader),
        ))
    }

    pub fn with_reader(
        contract: AccountName,
        request_timeout: Duration,
        reader: Arc<dyn ChainReader>,
    ) -> Self {
        Self {
            actions: ActionBuilder::new(contract.clone()),
            contract,
            request_timeout,
            reader,
            invite_data: Slot::new(),
            global_stats: Slot::new(),
            contract_config: Slot::new(),
        }
    }

    pub fn contract_account(&self) -> &AccountName {
        &self.contract
    }

    pub fn actions(&self) -> &ActionBuilder {
        &self.actions
    }

    pub fn invite_data(&self) -> SlotReader<InviteRecord> {
        self.invite_data.reader()
    }

    pub fn global_stats(&self) -> SlotReader<GlobalStats> {
        self.global_stats.reader()
    }

    pub fn contract_config(&self) -> SlotReader<ContractConfig> {
        self.contract_config.reader()
    }

    /// Publishes `account`'s adopter row, or absence when there is none or
    /// the read fails.
    pub async fn fetch_invite_data(&self, account: &AccountName) {
        let query = TableQuery::new(&self.contract, TableName::Adopters).with_key(account);
        let value = match self.read_first_row::<AdopterRow>(&query).await {
            Ok(Some(row)) if row.account == account.as_str() => Some(InviteRecord::from(row)),
            Ok(Some(row)) => {
                warn!(
                    account = account.as_str(),
                    returned = row.account.as_str(),
                    "sync: adopters lookup returned another account, clearing slot"
                );
                None
            }
            Ok(None) => {
                debug!(account = account.as_str(), "sync: account has no adopters row");
                None
            }
            Err(err) => {
                warn!(account = account.as_str(), error = %err, "sync: failed to fetch invite data");
                None
            }
        };
        self.invite_data.publish(value);
    }

    pub async fn fetch_global_stats(&self) {
        let query = TableQuery::new(&self.contract, TableName::Stats);
        self.sync_singleton::<StatsRow, _>(&self.global_stats, &query)
            .await;
    }

    pub async fn fetch_contract_config(&self) {
        let query = TableQuery::new(&self.contract, TableName::Config);
        self.sync_singleton::<ConfigRow, _>(&self.contract_config, &query)
            .await;
    }

    /// Runs all three fetches concurrently; never fails, each slot settles on
    /// its own.
    pub async fn refresh_all_data(&self, account: &AccountName) {
        futures::join!(
            self.fetch_invite_data(account),
            self.fetch_global_stats(),
            self.fetch_contract_config(),
        );
    }

    async fn sync_singleton<R, T>(&self, slot: &Slot<T>, query: &TableQuery)
    where
        R: DeserializeOwned,
        T: From<R> + Clone + Send + Sync + 'static,
    {
        let value = match self.read_first_row::<R>(query).await {
            Ok(row) => row.map(T::from),
            Err(err) => {
                warn!(table = query.table.as_str(), error = %err, "sync: failed to fetch table");
                None
            }
        };
        if value.is_none() {
            debug!(table = query.table.as_str(), "sync: slot cleared");
        }
        slot.publish(value);
    }

    async fn read_first_row<R>(&self, query: &TableQuery) -> Result<Option<R>, TransportError>
    where
        R: DeserializeOwned,
    {
        let rows = tokio::time::timeout(self.request_timeout, self.reader.get_table_rows(query))
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))??;

        let Some(first) = rows.rows.into_iter().next() else {
            return Ok(None);
        };
        serde_json::from_value(first).map(Some).map_err(|err| {
            TransportError::Decode(format!("{} row: {err}", query.table.as_str()))
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
