//! Player wallet state and the coin floor policy.
use serde::{Deserialize, Serialize};

/// A single account's spendable coins and lifetime XP.
///
/// Created at zero for a fresh account and mutated only through reward
/// settlement (or administrative overrides outside this crate). Cumulative XP
/// never decreases; coins may go negative under the default floor policy
/// because penalties are real debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerEconomy {
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub cumulative_xp: u64,
}

/// Policy for how far a penalty may push the coin balance down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinFloor {
    /// Penalties apply in full; balances may go negative.
    #[default]
    Unclamped,
    /// Debits stop at zero. An already-negative balance is left where it is,
    /// never raised.
    ClampAtZero,
}

impl CoinFloor {
    /// Trim a requested coin delta against the current balance.
    /// Returns the delta that may actually be applied.
    #[must_use]
    pub fn effective_delta(self, coins: i64, delta: i64) -> i64 {
        match self {
            Self::Unclamped => delta,
            Self::ClampAtZero => {
                if delta >= 0 {
                    delta
                } else {
                    let floor = coins.min(0);
                    coins.saturating_add(delta).max(floor) - coins
                }
            }
        }
    }
}

impl PlayerEconomy {
    /// Fresh account wallet: no coins, no XP.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            coins: 0,
            cumulative_xp: 0,
        }
    }

    /// Apply a coin/XP change under the given floor policy.
    /// Returns the effective coin delta after flooring, which is what must
    /// also be persisted remotely to keep both copies consistent.
    pub fn apply(&mut self, coins_delta: i64, xp_delta: u32, floor: CoinFloor) -> i64 {
        let effective = floor.effective_delta(self.coins, coins_delta);
        self.coins = self.coins.saturating_add(effective);
        self.cumulative_xp = self.cumulative_xp.saturating_add(u64::from(xp_delta));
        effective
    }
}
