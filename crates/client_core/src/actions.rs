//! Action payloads for the invite contract. Pure constructors; eligibility is
//! enforced on chain.

use serde_json::{Map, Value};
use shared::{
    domain::AccountName,
    protocol::{ActionDescriptor, PermissionLevel},
};

pub const ACTIVE_PERMISSION: &str = "active";
pub const REGISTER_USER_ACTION: &str = "registeruser";
pub const CLAIM_REWARD_ACTION: &str = "claimreward";
pub const SET_CONFIG_ACTION: &str = "setconfig";
pub const DELETE_USER_ACTION: &str = "deleteuser";

/// Arguments of the admin `setconfig` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParams {
    pub min_age_days: u32,
    pub rate_seconds: u32,
    pub enabled: bool,
    pub max_depth: u16,
    pub multiplier: u16,
    pub token_contract: AccountName,
    pub reward_symbol: String,
    pub reward_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBuilder {
    contract: AccountName,
}

impl ActionBuilder {
    pub fn new(contract: AccountName) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &AccountName {
        &self.contract
    }

    pub fn register(&self, account: &AccountName, inviter: &AccountName) -> ActionDescriptor {
        self.action(
            REGISTER_USER_ACTION,
            account,
            fields([("user", name_value(account)), ("inviter", name_value(inviter))]),
        )
    }

    pub fn claim(&self, account: &AccountName) -> ActionDescriptor {
        self.action(
            CLAIM_REWARD_ACTION,
            account,
            fields([("user", name_value(account))]),
        )
    }

    pub fn set_config(&self, admin: &AccountName, params: &ConfigParams) -> ActionDescriptor {
        self.action(
            SET_CONFIG_ACTION,
            admin,
            fields([
                ("admin", name_value(admin)),
                ("min_age_days", Value::from(params.min_age_days)),
                ("rate_seconds", Value::from(params.rate_seconds)),
                ("enabled", Value::from(params.enabled)),
                ("max_depth", Value::from(params.max_depth)),
                ("multiplier", Value::from(params.multiplier)),
                ("token_contract", name_value(&params.token_contract)),
                ("reward_symbol", Value::from(params.reward_symbol.as_str())),
                ("reward_rate", Value::from(params.reward_rate)),
            ]),
        )
    }

    /// Authorized by the contract account itself.
    pub fn delete_user(&self, user: &AccountName) -> ActionDescriptor {
        self.action(
            DELETE_USER_ACTION,
            &self.contract,
            fields([("user", name_value(user))]),
        )
    }

    fn action(&self, name: &str, actor: &AccountName, data: Map<String, Value>) -> ActionDescriptor {
        ActionDescriptor {
            target_contract: self.contract.clone(),
            action_name: name.to_string(),
            authorization: vec![PermissionLevel::new(actor.clone(), ACTIVE_PERMISSION)],
            data,
        }
    }
}

fn name_value(name: &AccountName) -> Value {
    Value::from(name.as_str())
}

fn fields<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
