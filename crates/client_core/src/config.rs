use std::{collections::HashMap, fs, time::Duration};

use shared::domain::AccountName;
use tracing::info;
use url::Url;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "invitono.toml";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETURN_URL: &str = "https://tools.cxc.world/invitono";

const WAX_MAINNET_CHAIN_ID: &str =
    "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4";
const WAX_TESTNET_CHAIN_ID: &str =
    "f16b1833c747c43682f4386fca9cbb327929334a762755ebec17f6f23c9b8a12";

/// Per-network binding of contract account, query endpoint and login endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: String,
    pub contract_account: AccountName,
    pub api_url: String,
    pub request_timeout: Duration,
    pub sso_origin: Url,
    pub return_url: Url,
    pub database_url: String,
}

/// What the session manager needs from the network binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub chain_id: String,
    pub sso_origin: Url,
    pub return_url: Url,
}

impl NetworkConfig {
    pub fn mainnet() -> Result<Self, ConfigError> {
        Self::preset(
            "mainnet",
            WAX_MAINNET_CHAIN_ID,
            "tono.cxc",
            "https://wax.greymass.com",
            "https://accounts.pangea.web4.world",
        )
    }

    pub fn testnet() -> Result<Self, ConfigError> {
        Self::preset(
            "testnet",
            WAX_TESTNET_CHAIN_ID,
            "tonotest.cxc",
            "https://testnet.wax.pink.gg",
            "https://accounts.testnet.pangea.web4.world",
        )
    }

    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Self::mainnet(),
            "testnet" | "test" => Self::testnet(),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }

    fn preset(
        name: &str,
        chain_id: &str,
        contract: &str,
        api_url: &str,
        sso_origin: &str,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self {
            name: name.to_string(),
            chain_id: chain_id.to_string(),
            contract_account: AccountName::parse(contract).map_err(|err| {
                ConfigError::InvalidValue {
                    key: "contract_account".to_string(),
                    message: err.to_string(),
                }
            })?,
            api_url: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sso_origin: parse_url("sso_origin", sso_origin)?,
            return_url: parse_url("return_url", DEFAULT_RETURN_URL)?,
            database_url: format!("sqlite://./data/invitono-{name}.db"),
        };
        settings.set("api_url", api_url)?;
        Ok(settings)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            chain_id: self.chain_id.clone(),
            sso_origin: self.sso_origin.clone(),
            return_url: self.return_url.clone(),
        }
    }

    /// Applies `key = "value"` pairs from a config file body.
    pub fn apply_file(&mut self, raw: &str) -> Result<(), ConfigError> {
        let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
        for key in [
            "api_url",
            "contract_account",
            "sso_origin",
            "return_url",
            "database_url",
            "request_timeout_seconds",
        ] {
            if let Some(value) = file_cfg.get(key) {
                self.set(key, value)?;
            }
        }
        Ok(())
    }

    /// Applies environment overrides; `APP__*` wins over the short names.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pairs = [
            ("INVITONO_API_URL", "api_url"),
            ("APP__API_URL", "api_url"),
            ("INVITONO_CONTRACT", "contract_account"),
            ("APP__CONTRACT_ACCOUNT", "contract_account"),
            ("APP__SSO_ORIGIN", "sso_origin"),
            ("APP__RETURN_URL", "return_url"),
            ("APP__DATABASE_URL", "database_url"),
            ("APP__REQUEST_TIMEOUT_SECONDS", "request_timeout_seconds"),
        ];
        for (var, key) in pairs {
            if let Some(value) = lookup(var) {
                self.set(key, &value)?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        match key {
            "api_url" => {
                Url::parse(value).map_err(|err| invalid(err.to_string()))?;
                self.api_url = value.trim_end_matches('/').to_string();
            }
            "contract_account" => {
                self.contract_account =
                    AccountName::parse(value).map_err(|err| invalid(err.to_string()))?;
            }
            "sso_origin" => self.sso_origin = parse_url(key, value)?,
            "return_url" => self.return_url = parse_url(key, value)?,
            "database_url" => self.database_url = value.to_string(),
            "request_timeout_seconds" => {
                let seconds = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| invalid(err.to_string()))?;
                if seconds == 0 {
                    return Err(invalid("timeout must be at least one second".to_string()));
                }
                self.request_timeout = Duration::from_secs(seconds);
            }
            other => return Err(invalid(format!("unknown setting '{other}'"))),
        }
        Ok(())
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    })
}

/// Preset for `network`, overlaid by `invitono.toml` and then the environment.
pub fn load_settings(network: &str) -> Result<NetworkConfig, ConfigError> {
    let mut settings = NetworkConfig::by_name(network)?;

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        settings.apply_file(&raw)?;
    }
    settings.apply_env(|key| std::env::var(key).ok())?;

    info!(
        network = settings.name.as_str(),
        contract = settings.contract_account.as_str(),
        api_url = settings.api_url.as_str(),
        "config: settings loaded"
    );
    Ok(settings)
}
