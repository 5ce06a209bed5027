use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest name the ledger accepts; the 13th character is restricted.
pub const MAX_ACCOUNT_NAME_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("account name must not be empty")]
    Empty,
    #[error("account name '{0}' is longer than 13 characters")]
    TooLong(String),
    #[error("account name '{name}' has invalid character '{ch}' at position {position}")]
    InvalidChar {
        name: String,
        ch: char,
        position: usize,
    },
    #[error("account name '{0}' must not end with '.'")]
    TrailingDot(String),
}

/// A validated ledger account name (`a-z`, `1-5` and `.`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw.len() > MAX_ACCOUNT_NAME_LEN {
            return Err(NameError::TooLong(raw.to_string()));
        }

        for (position, ch) in raw.chars().enumerate() {
            let allowed = if position < MAX_ACCOUNT_NAME_LEN - 1 {
                matches!(ch, 'a'..='z' | '1'..='5' | '.')
            } else {
                matches!(ch, 'a'..='j' | '1'..='5' | '.')
            };
            if !allowed {
                return Err(NameError::InvalidChar {
                    name: raw.to_string(),
                    ch,
                    position,
                });
            }
        }

        if raw.ends_with('.') {
            return Err(NameError::TrailingDot(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountName> for String {
    fn from(value: AccountName) -> Self {
        value.0
    }
}

/// Which login path produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    Wallet,
    Sso,
}

impl SessionBackend {
    pub const ALL: [SessionBackend; 2] = [SessionBackend::Wallet, SessionBackend::Sso];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionBackend::Wallet => "wallet",
            SessionBackend::Sso => "sso",
        }
    }
}

impl fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wallet" => Ok(SessionBackend::Wallet),
            "sso" => Ok(SessionBackend::Sso),
            other => Err(format!("unknown session backend '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_and_dotted_names() {
        for raw in ["alice", "tono.cxc", "a", "abcde12345.z", "abcdefghijklj"] {
            assert!(AccountName::parse(raw).is_ok(), "expected '{raw}' to parse");
        }
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(AccountName::parse(""), Err(NameError::Empty));
        assert!(matches!(
            AccountName::parse("Alice"),
            Err(NameError::InvalidChar { ch: 'A', position: 0, .. })
        ));
        assert!(matches!(
            AccountName::parse("bob6"),
            Err(NameError::InvalidChar { ch: '6', .. })
        ));
        assert!(matches!(
            AccountName::parse("abcdefghijklz"),
            Err(NameError::InvalidChar { ch: 'z', position: 12, .. })
        ));
        assert!(matches!(
            AccountName::parse("abcdefghijklmn"),
            Err(NameError::TooLong(_))
        ));
        assert!(matches!(
            AccountName::parse("alice."),
            Err(NameError::TrailingDot(_))
        ));
    }

    #[test]
    fn serializes_as_plain_string() {
        let name = AccountName::parse("alice").expect("name");
        assert_eq!(serde_json::to_string(&name).expect("json"), "\"alice\"");
        let parsed: AccountName = serde_json::from_str("\"bob\"").expect("parse");
        assert_eq!(parsed.as_str(), "bob");
        assert!(serde_json::from_str::<AccountName>("\"NOPE\"").is_err());
    }
}
