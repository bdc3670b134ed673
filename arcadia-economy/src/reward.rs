//! Reward calculation: turning a finished session's outcome facts into a
//! coin/XP delta via a game's declarative reward table.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::GameConfig;

/// How a game session ended, from the economy's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Win,
    Loss,
    Draw,
    GaveUp,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeKind::Win => write!(f, "win"),
            OutcomeKind::Loss => write!(f, "loss"),
            OutcomeKind::Draw => write!(f, "draw"),
            OutcomeKind::GaveUp => write!(f, "gave_up"),
        }
    }
}

/// Facts a game caller reports once, at the end of one session.
///
/// `measured_value` carries whatever the game's reward table keys on: a
/// reaction time in milliseconds, an elapsed time in seconds, a score, a
/// click count. Its meaning is fixed per game, not globally.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcomeFact {
    pub game_id: String,
    pub outcome: OutcomeKind,
    pub difficulty: Option<String>,
    pub mode: Option<String>,
    pub measured_value: Option<f64>,
}

impl GameOutcomeFact {
    #[must_use]
    pub fn new(game_id: impl Into<String>, outcome: OutcomeKind) -> Self {
        Self {
            game_id: game_id.into(),
            outcome,
            difficulty: None,
            mode: None,
            measured_value: None,
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn with_measured(mut self, value: f64) -> Self {
        self.measured_value = Some(value);
        self
    }
}

/// The computed settlement input for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardResult {
    pub coins_delta: i64,
    pub xp_delta: u32,
    /// Whether this outcome qualifies to advance the difficulty frontier.
    pub unlock_advance: bool,
}

/// Coin/XP pair used inside step payouts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepPayout {
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub xp: u32,
}

/// One rung of a monotone step function over the measured value. The first
/// step whose `below` bound exceeds the measurement wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutStep {
    pub below: f64,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub xp: u32,
}

/// How an entry converts outcome facts into coins and XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payout {
    /// Flat amount regardless of performance.
    Fixed {
        coins: i64,
        #[serde(default)]
        xp: u32,
    },
    /// Performance brackets over the measured value (reaction times, click
    /// counts). Steps must be strictly ascending in `below`; `otherwise`
    /// applies past the last bracket.
    Steps {
        steps: Vec<PayoutStep>,
        #[serde(default)]
        otherwise: StepPayout,
    },
    /// Proportional to the measured value (scores). With
    /// `difficulty_weighted` the total also scales by the difficulty's
    /// one-based ladder position.
    Scaled {
        #[serde(default)]
        per_unit_coins: i64,
        #[serde(default)]
        per_unit_xp: u32,
        #[serde(default)]
        flat_bonus: i64,
        #[serde(default)]
        difficulty_weighted: bool,
    },
    /// Flat amount plus a bonus for finishing fast: one extra coin per
    /// `bonus_divisor` seconds left inside `bonus_window`.
    SpeedBonus {
        coins: i64,
        #[serde(default)]
        xp: u32,
        bonus_window: f64,
        bonus_divisor: f64,
    },
}

/// One row of a reward table: outcome plus optional difficulty/mode
/// selectors. A `None` selector matches anything, so specific rows should be
/// listed before catch-alls; the first matching row wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub outcome: OutcomeKind,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    pub payout: Payout,
    #[serde(default)]
    pub advances_unlock: bool,
}

impl RewardEntry {
    fn matches(&self, outcome: OutcomeKind, difficulty: Option<&str>, mode: Option<&str>) -> bool {
        self.outcome == outcome
            && self
                .difficulty
                .as_deref()
                .is_none_or(|want| difficulty == Some(want))
            && self.mode.as_deref().is_none_or(|want| mode == Some(want))
    }
}

/// Declarative reward mapping for one game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardTable {
    pub entries: Vec<RewardEntry>,
}

impl RewardTable {
    /// First entry matching the given combination.
    #[must_use]
    pub fn find_entry(
        &self,
        outcome: OutcomeKind,
        difficulty: Option<&str>,
        mode: Option<&str>,
    ) -> Option<&RewardEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(outcome, difficulty, mode))
    }
}

/// Errors raised when outcome facts cannot be priced. All of these are
/// caller or configuration bugs, never ordinary runtime conditions.
#[derive(Debug, Error, PartialEq)]
pub enum RewardError {
    #[error("unknown game \"{0}\"")]
    UnknownGame(String),
    #[error("game \"{game}\" does not define difficulty \"{difficulty}\"")]
    UnknownDifficulty { game: String, difficulty: String },
    #[error("game \"{game}\" does not define mode \"{mode}\"")]
    UnknownMode { game: String, mode: String },
    #[error("game \"{game}\" has no reward entry for {outcome} (difficulty {difficulty:?}, mode {mode:?})")]
    MissingEntry {
        game: String,
        outcome: OutcomeKind,
        difficulty: Option<String>,
        mode: Option<String>,
    },
    #[error("game \"{game}\" reward for {outcome} needs a measured value")]
    MissingMeasurement { game: String, outcome: OutcomeKind },
    #[error("game \"{game}\" difficulty-weighted reward needs a difficulty")]
    MissingDifficulty { game: String },
}

/// Price a finished session. Pure: equal inputs always produce equal results.
///
/// # Errors
///
/// Returns a [`RewardError`] when the fact references difficulties or modes
/// the game does not declare, when no table entry covers the combination, or
/// when a performance payout is missing its measured value.
pub fn compute_reward(cfg: &GameConfig, fact: &GameOutcomeFact) -> Result<RewardResult, RewardError> {
    if let Some(difficulty) = fact.difficulty.as_deref() {
        if cfg.difficulties.ordinal_of(difficulty).is_none() {
            return Err(RewardError::UnknownDifficulty {
                game: cfg.id.clone(),
                difficulty: difficulty.to_string(),
            });
        }
    }
    if let Some(mode) = fact.mode.as_deref() {
        if !cfg.modes.iter().any(|m| m == mode) {
            return Err(RewardError::UnknownMode {
                game: cfg.id.clone(),
                mode: mode.to_string(),
            });
        }
    }

    let entry = cfg
        .rewards
        .find_entry(fact.outcome, fact.difficulty.as_deref(), fact.mode.as_deref())
        .ok_or_else(|| RewardError::MissingEntry {
            game: cfg.id.clone(),
            outcome: fact.outcome,
            difficulty: fact.difficulty.clone(),
            mode: fact.mode.clone(),
        })?;

    let (coins_delta, xp_delta) = evaluate_payout(cfg, entry, fact)?;
    Ok(RewardResult {
        coins_delta,
        xp_delta,
        unlock_advance: entry.advances_unlock && fact.outcome == OutcomeKind::Win,
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn evaluate_payout(
    cfg: &GameConfig,
    entry: &RewardEntry,
    fact: &GameOutcomeFact,
) -> Result<(i64, u32), RewardError> {
    match &entry.payout {
        Payout::Fixed { coins, xp } => Ok((*coins, *xp)),
        Payout::Steps { steps, otherwise } => {
            let measured = require_measured(cfg, fact)?;
            let hit = steps.iter().find(|step| measured < step.below);
            Ok(hit.map_or((otherwise.coins, otherwise.xp), |step| {
                (step.coins, step.xp)
            }))
        }
        Payout::Scaled {
            per_unit_coins,
            per_unit_xp,
            flat_bonus,
            difficulty_weighted,
        } => {
            let units = require_measured(cfg, fact)?.max(0.0);
            let weight = if *difficulty_weighted {
                let difficulty =
                    fact.difficulty
                        .as_deref()
                        .ok_or_else(|| RewardError::MissingDifficulty {
                            game: cfg.id.clone(),
                        })?;
                let ordinal = cfg.difficulties.ordinal_of(difficulty).ok_or_else(|| {
                    RewardError::UnknownDifficulty {
                        game: cfg.id.clone(),
                        difficulty: difficulty.to_string(),
                    }
                })?;
                (ordinal + 1) as f64
            } else {
                1.0
            };
            let scaled = (units * weight).floor();
            let coins = per_unit_coins.saturating_mul(scaled as i64) + flat_bonus;
            let xp = (f64::from(*per_unit_xp) * scaled) as u32;
            Ok((coins, xp))
        }
        Payout::SpeedBonus {
            coins,
            xp,
            bonus_window,
            bonus_divisor,
        } => {
            let elapsed = require_measured(cfg, fact)?;
            let bonus = ((bonus_window - elapsed).max(0.0) / bonus_divisor).floor() as i64;
            Ok((coins + bonus, *xp))
        }
    }
}

fn require_measured(cfg: &GameConfig, fact: &GameOutcomeFact) -> Result<f64, RewardError> {
    fact.measured_value
        .ok_or_else(|| RewardError::MissingMeasurement {
            game: cfg.id.clone(),
            outcome: fact.outcome,
        })
}
