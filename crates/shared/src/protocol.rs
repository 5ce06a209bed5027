use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::AccountName;

/// Tables exposed by the invite contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Adopters,
    Stats,
    Config,
}

impl TableName {
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Adopters => "adopters",
            TableName::Stats => "stats",
            TableName::Config => "config",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTableRowsRequest {
    pub code: String,
    pub scope: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    pub limit: u32,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTableRowsResponse {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub next_key: String,
}

/// `adopters` table row, keyed by `account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdopterRow {
    pub account: String,
    #[serde(default)]
    pub invitedby: String,
    #[serde(deserialize_with = "number_or_string")]
    pub lastupdated: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub score: u32,
    #[serde(deserialize_with = "bool_or_flag")]
    pub claimed: bool,
}

/// `stats` singleton row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRow {
    #[serde(deserialize_with = "number_or_string")]
    pub total_referrals: u64,
    #[serde(deserialize_with = "number_or_string")]
    pub total_users: u64,
    #[serde(default)]
    pub last_registered: String,
}

/// `config` singleton row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRow {
    #[serde(deserialize_with = "number_or_string")]
    pub min_account_age_days: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub invite_rate_seconds: u32,
    #[serde(deserialize_with = "bool_or_flag")]
    pub enabled: bool,
    #[serde(default)]
    pub admin: String,
    #[serde(deserialize_with = "number_or_string")]
    pub max_referral_depth: u16,
    #[serde(deserialize_with = "number_or_string")]
    pub multiplier: u16,
    pub token_contract: String,
    pub reward_symbol: String,
    #[serde(deserialize_with = "number_or_string")]
    pub reward_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: AccountName,
    pub permission: String,
}

impl PermissionLevel {
    pub fn new(actor: AccountName, permission: impl Into<String>) -> Self {
        Self {
            actor,
            permission: permission.into(),
        }
    }
}

/// A single contract action, in the ledger's action JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    #[serde(rename = "account")]
    pub target_contract: AccountName,
    #[serde(rename = "name")]
    pub action_name: String,
    pub authorization: Vec<PermissionLevel>,
    pub data: Map<String, Value>,
}

/// Result of a broadcast transaction as reported by the signing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactResult {
    pub transaction_id: String,
    #[serde(default)]
    pub processed: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
}

// Wide integers may come back quoted depending on the node's serializer.
fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    match NumberOrString::<T>::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrFlag {
    Bool(bool),
    Flag(u8),
}

fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match BoolOrFlag::deserialize(deserializer)? {
        BoolOrFlag::Bool(value) => Ok(value),
        BoolOrFlag::Flag(0) => Ok(false),
        BoolOrFlag::Flag(1) => Ok(true),
        BoolOrFlag::Flag(other) => Err(de::Error::custom(format!(
            "expected boolean flag 0 or 1, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_adopter_row_from_node_json() {
        let row: AdopterRow = serde_json::from_value(json!({
            "account": "alice",
            "invitedby": "bob",
            "lastupdated": 1718000000,
            "score": 7,
            "claimed": 0
        }))
        .expect("adopter row");
        assert_eq!(row.lastupdated, 1718000000);
        assert_eq!(row.score, 7);
        assert!(!row.claimed);
    }

    #[test]
    fn decodes_quoted_wide_integers() {
        let row: StatsRow = serde_json::from_value(json!({
            "total_referrals": "18446744073709551615",
            "total_users": 12,
            "last_registered": "carol"
        }))
        .expect("stats row");
        assert_eq!(row.total_referrals, u64::MAX);
        assert_eq!(row.total_users, 12);
    }

    #[test]
    fn rejects_out_of_range_flag() {
        let result = serde_json::from_value::<AdopterRow>(json!({
            "account": "alice",
            "lastupdated": 1,
            "score": 1,
            "claimed": 2
        }));
        assert!(result.is_err());
    }

    #[test]
    fn action_descriptor_uses_ledger_field_names() {
        let action = ActionDescriptor {
            target_contract: AccountName::parse("tono.cxc").expect("name"),
            action_name: "claimreward".to_string(),
            authorization: vec![PermissionLevel::new(
                AccountName::parse("alice").expect("name"),
                "active",
            )],
            data: json!({"user": "alice"})
                .as_object()
                .cloned()
                .expect("object"),
        };
        assert_eq!(
            serde_json::to_value(&action).expect("json"),
            json!({
                "account": "tono.cxc",
                "name": "claimreward",
                "authorization": [{"actor": "alice", "permission": "active"}],
                "data": {"user": "alice"}
            })
        );
    }
}
