//! Client-side preview of what `claimreward` would pay out. Advisory only; the
//! contract's own checks decide.

use serde::Serialize;

use crate::types::{ContractConfig, InviteRecord, FIXED_POINT_BASE};

/// Tetrahedral numbers used by the contract to turn a score into a position.
const TETRAHEDRAL: [u32; 25] = [
    1, 4, 10, 20, 35, 56, 84, 120, 165, 220, 286, 364, 455, 560, 680, 816, 969, 1140, 1330, 1540,
    1771, 2024, 2300, 2600, 999_999_999,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEstimate {
    pub position: u32,
    /// Smallest token units.
    pub amount: i64,
    /// Asset string, e.g. `3.00000000 WAX`.
    pub quantity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimBlocker {
    NotRegistered,
    ContractDisabled,
    AlreadyClaimed,
    NoScore,
}

/// Index of the first tetrahedral number greater than `score`.
pub fn tetrahedral_position(score: u32) -> u32 {
    let index = TETRAHEDRAL
        .iter()
        .position(|&threshold| threshold > score)
        .unwrap_or(TETRAHEDRAL.len() - 1);
    index as u32
}

pub fn estimate_reward(invite: &InviteRecord, config: &ContractConfig) -> Option<RewardEstimate> {
    if invite.claimed || invite.score == 0 {
        return None;
    }
    let symbol = config.reward_symbol()?;

    let position = tetrahedral_position(invite.score);
    let unit = 10_i64.checked_pow(u32::from(symbol.precision))?;
    let amount = i64::from(position)
        .checked_mul(unit)?
        .checked_mul(i64::from(config.reward_rate))?
        / i64::from(FIXED_POINT_BASE);

    let quantity = if symbol.precision == 0 {
        format!("{amount} {}", symbol.code)
    } else {
        format!(
            "{}.{:0width$} {}",
            amount / unit,
            amount % unit,
            symbol.code,
            width = usize::from(symbol.precision)
        )
    };

    Some(RewardEstimate {
        position,
        amount,
        quantity,
    })
}

/// On-chain checks that would currently reject a claim.
pub fn claim_blockers(
    invite: Option<&InviteRecord>,
    config: Option<&ContractConfig>,
) -> Vec<ClaimBlocker> {
    let mut blockers = Vec::new();
    if config.is_some_and(|config| !config.enabled) {
        blockers.push(ClaimBlocker::ContractDisabled);
    }
    match invite {
        None => blockers.push(ClaimBlocker::NotRegistered),
        Some(invite) => {
            if invite.claimed {
                blockers.push(ClaimBlocker::AlreadyClaimed);
            }
            if invite.score == 0 {
                blockers.push(ClaimBlocker::NoScore);
            }
        }
    }
    blockers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(reward_symbol: &str, reward_rate: u32) -> ContractConfig {
        ContractConfig {
            min_account_age_days: 30,
            invite_rate_seconds: 3600,
            enabled: true,
            admin: "tono.cxc".to_string(),
            max_referral_depth: 5,
            multiplier: 100,
            token_contract: "eosio.token".to_string(),
            reward_symbol: reward_symbol.to_string(),
            reward_rate,
        }
    }

    fn invite(score: u32, claimed: bool) -> InviteRecord {
        InviteRecord {
            score,
            claimed,
            last_updated: 1_718_000_000,
        }
    }

    #[test]
    fn positions_follow_the_tetrahedral_series() {
        assert_eq!(tetrahedral_position(0), 0);
        assert_eq!(tetrahedral_position(1), 1);
        assert_eq!(tetrahedral_position(3), 1);
        assert_eq!(tetrahedral_position(4), 2);
        assert_eq!(tetrahedral_position(10), 3);
        assert_eq!(tetrahedral_position(2600), 24);
        assert_eq!(tetrahedral_position(u32::MAX), 24);
    }

    #[test]
    fn estimate_scales_by_precision_and_rate() {
        let estimate = estimate_reward(&invite(12, false), &config("8,WAX", 100)).expect("estimate");
        assert_eq!(estimate.position, 3);
        assert_eq!(estimate.amount, 300_000_000);
        assert_eq!(estimate.quantity, "3.00000000 WAX");

        let half = estimate_reward(&invite(1, false), &config("4,TONO", 50)).expect("estimate");
        assert_eq!(half.amount, 5_000);
        assert_eq!(half.quantity, "0.5000 TONO");

        let whole = estimate_reward(&invite(4, false), &config("0,PTS", 100)).expect("estimate");
        assert_eq!(whole.quantity, "2 PTS");
    }

    #[test]
    fn no_estimate_when_claim_would_fail_or_symbol_is_unreadable() {
        assert!(estimate_reward(&invite(12, true), &config("8,WAX", 100)).is_none());
        assert!(estimate_reward(&invite(0, false), &config("8,WAX", 100)).is_none());
        assert!(estimate_reward(&invite(12, false), &config("WAX", 100)).is_none());
    }

    #[test]
    fn blockers_mirror_contract_checks() {
        let mut disabled = config("8,WAX", 100);
        disabled.enabled = false;
        assert_eq!(
            claim_blockers(Some(&invite(0, true)), Some(&disabled)),
            vec![
                ClaimBlocker::ContractDisabled,
                ClaimBlocker::AlreadyClaimed,
                ClaimBlocker::NoScore
            ]
        );
        assert_eq!(claim_blockers(None, None), vec![ClaimBlocker::NotRegistered]);
        assert!(claim_blockers(Some(&invite(3, false)), Some(&config("8,WAX", 100))).is_empty());
    }
}
