use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::protocol::{AdopterRow, ConfigRow, StatsRow};

/// Fixed-point base the contract uses for `multiplier` and `reward_rate`.
pub const FIXED_POINT_BASE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRecord {
    pub score: u32,
    pub claimed: bool,
    /// Unix seconds, exactly as stored on chain.
    pub last_updated: u32,
}

impl InviteRecord {
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.last_updated), 0)
    }
}

impl From<AdopterRow> for InviteRecord {
    fn from(row: AdopterRow) -> Self {
        Self {
            score: row.score,
            claimed: row.claimed,
            last_updated: row.lastupdated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_referrals: u64,
    pub total_users: u64,
    pub last_registered: String,
}

impl From<StatsRow> for GlobalStats {
    fn from(row: StatsRow) -> Self {
        Self {
            total_referrals: row.total_referrals,
            total_users: row.total_users,
            last_registered: row.last_registered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractConfig {
    pub min_account_age_days: u32,
    pub invite_rate_seconds: u32,
    pub enabled: bool,
    pub admin: String,
    pub max_referral_depth: u16,
    /// Raw fixed-point value, 100 = 1.0x.
    pub multiplier: u16,
    pub token_contract: String,
    /// Ledger symbol string, e.g. `8,WAX`.
    pub reward_symbol: String,
    /// Raw fixed-point tokens per position, 100 = 1.00 token.
    pub reward_rate: u32,
}

impl ContractConfig {
    pub fn multiplier_factor(&self) -> f64 {
        f64::from(self.multiplier) / f64::from(FIXED_POINT_BASE)
    }

    pub fn reward_symbol(&self) -> Option<RewardSymbol> {
        self.reward_symbol.parse().ok()
    }

    pub fn reward_precision(&self) -> Option<u8> {
        self.reward_symbol().map(|symbol| symbol.precision)
    }
}

impl From<ConfigRow> for ContractConfig {
    fn from(row: ConfigRow) -> Self {
        Self {
            min_account_age_days: row.min_account_age_days,
            invite_rate_seconds: row.invite_rate_seconds,
            enabled: row.enabled,
            admin: row.admin,
            max_referral_depth: row.max_referral_depth,
            multiplier: row.multiplier,
            token_contract: row.token_contract,
            reward_symbol: row.reward_symbol,
            reward_rate: row.reward_rate,
        }
    }
}

/// Parsed `precision,CODE` token symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSymbol {
    pub precision: u8,
    pub code: String,
}

const MAX_SYMBOL_PRECISION: u8 = 18;
const MAX_SYMBOL_CODE_LEN: usize = 7;

impl FromStr for RewardSymbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| format!("symbol '{s}' is not in 'precision,CODE' form"))?;
        let precision: u8 = precision
            .trim()
            .parse()
            .map_err(|err| format!("symbol '{s}' has invalid precision: {err}"))?;
        if precision > MAX_SYMBOL_PRECISION {
            return Err(format!("symbol '{s}' precision exceeds {MAX_SYMBOL_PRECISION}"));
        }
        let code = code.trim();
        if code.is_empty()
            || code.len() > MAX_SYMBOL_CODE_LEN
            || !code.chars().all(|ch| ch.is_ascii_uppercase())
        {
            return Err(format!("symbol '{s}' has invalid code"));
        }
        Ok(Self {
            precision,
            code: code.to_string(),
        })
    }
}

impl fmt::Display for RewardSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}
