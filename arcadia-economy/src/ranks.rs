//! Rank tiers derived from cumulative XP.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_RANKS_DATA: &str = include_str!("../assets/ranks.json");

/// One tier in the ordered rank ladder.
///
/// The presentational fields (`color`, `border`, `glow`) are opaque to this
/// crate; they round-trip through serde untouched so the UI can style badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTier {
    pub name: String,
    pub min_xp: u64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub border: Option<String>,
    #[serde(default)]
    pub glow: Option<String>,
    /// One-time coin grant credited when a player is promoted into this tier.
    #[serde(default)]
    pub promotion_bonus: i64,
}

/// Errors raised when a rank table violates its construction invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankTableError {
    #[error("rank table needs at least one tier")]
    Empty,
    #[error("lowest tier must start at 0 XP (got {0})")]
    BaselineNotZero(u64),
    #[error("tier \"{name}\" does not increase min_xp over its predecessor ({prev} -> {value})")]
    NotStrictlyIncreasing { name: String, prev: u64, value: u64 },
    #[error("tier \"{name}\" has a negative promotion bonus")]
    NegativeBonus { name: String },
}

/// Validated, ordered rank ladder. The lowest tier starts at 0 XP and acts as
/// the default for every balance, so resolution is total.
#[derive(Debug, Clone, PartialEq)]
pub struct RankTable {
    tiers: Vec<RankTier>,
}

#[derive(Deserialize)]
struct RankTableData {
    tiers: Vec<RankTier>,
}

impl RankTable {
    /// Build a table from an ordered tier list, validating the invariants:
    /// non-empty, baseline at 0 XP, strictly increasing thresholds,
    /// non-negative bonuses.
    ///
    /// # Errors
    ///
    /// Returns a [`RankTableError`] describing the first violated invariant.
    pub fn new(tiers: Vec<RankTier>) -> Result<Self, RankTableError> {
        let Some(first) = tiers.first() else {
            return Err(RankTableError::Empty);
        };
        if first.min_xp != 0 {
            return Err(RankTableError::BaselineNotZero(first.min_xp));
        }
        for pair in tiers.windows(2) {
            if pair[1].min_xp <= pair[0].min_xp {
                return Err(RankTableError::NotStrictlyIncreasing {
                    name: pair[1].name.clone(),
                    prev: pair[0].min_xp,
                    value: pair[1].min_xp,
                });
            }
        }
        if let Some(tier) = tiers.iter().find(|tier| tier.promotion_bonus < 0) {
            return Err(RankTableError::NegativeBonus {
                name: tier.name.clone(),
            });
        }
        Ok(Self { tiers })
    }

    /// All tiers, lowest first.
    #[must_use]
    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    /// The highest tier whose threshold does not exceed `xp`. Total: any XP
    /// value resolves to some tier because the baseline sits at 0.
    #[must_use]
    pub fn resolve(&self, xp: u64) -> &RankTier {
        let idx = self.tiers.partition_point(|tier| tier.min_xp <= xp);
        &self.tiers[idx.saturating_sub(1)]
    }

    /// Ordinal position of a tier within this table.
    #[must_use]
    pub fn index_of(&self, tier: &RankTier) -> Option<usize> {
        // min_xp is unique by construction, so it identifies the tier.
        self.tiers.iter().position(|t| t.min_xp == tier.min_xp)
    }

    /// The tier immediately above, or `None` for the top tier.
    #[must_use]
    pub fn next(&self, tier: &RankTier) -> Option<&RankTier> {
        self.index_of(tier).and_then(|idx| self.tiers.get(idx + 1))
    }

    /// Percentage progress from the current tier toward the next one, in
    /// `[0, 100]`. The top tier always reports 100.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_to_next(&self, xp: u64) -> f64 {
        let current = self.resolve(xp);
        let Some(next) = self.next(current) else {
            return 100.0;
        };
        let span = (next.min_xp - current.min_xp) as f64;
        let have = (xp - current.min_xp) as f64;
        (have / span * 100.0).clamp(0.0, 100.0)
    }

    /// The tier reached by moving from `before` to `after` XP, if the move
    /// crosses at least one threshold. A grant spanning several thresholds
    /// reports only the final tier reached.
    #[must_use]
    pub fn promotion_between(&self, before: u64, after: u64) -> Option<&RankTier> {
        let from = self.resolve(before);
        let to = self.resolve(after);
        (to.min_xp > from.min_xp).then_some(to)
    }
}

/// The built-in Arcadia ladder (Barro through HighChallenger).
#[must_use]
pub fn default_rank_table() -> &'static RankTable {
    static TABLE: OnceLock<RankTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let data: RankTableData =
            serde_json::from_str(DEFAULT_RANKS_DATA).expect("embedded rank data parses");
        RankTable::new(data.tiers).expect("embedded rank data is well-formed")
    })
}
