//! Per-game configuration: modes, difficulty ladders, and reward tables.
//!
//! The catalog is validated when constructed: every declared
//! (outcome, difficulty, mode) combination must be priced by some reward
//! entry, so a finished session can never silently earn nothing because a
//! table row was forgotten.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::reward::{OutcomeKind, Payout, RewardTable};
use crate::unlock::DifficultyLadder;

const DEFAULT_GAMES_DATA: &str = include_str!("../assets/games.json");

/// Static economy configuration for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub id: String,
    pub name: String,
    /// Play modes that reach the economy ("pvc"/"pvp", "daily"/"infinite").
    /// Empty when the game has a single implicit mode.
    #[serde(default)]
    pub modes: Vec<String>,
    /// Ordered difficulty ladder; empty when the game has no difficulties.
    #[serde(default)]
    pub difficulties: DifficultyLadder,
    /// Outcome kinds this game can actually report.
    #[serde(default)]
    pub outcomes: Vec<OutcomeKind>,
    #[serde(default)]
    pub rewards: RewardTable,
    /// Daily-challenge games may complete one rewarded run per calendar day.
    #[serde(default)]
    pub daily_lock: bool,
}

/// Errors raised when catalog invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate game id \"{0}\"")]
    DuplicateGame(String),
    #[error("game \"{game}\": reward entry references unknown difficulty \"{difficulty}\"")]
    UnknownEntryDifficulty { game: String, difficulty: String },
    #[error("game \"{game}\": reward entry references unknown mode \"{mode}\"")]
    UnknownEntryMode { game: String, mode: String },
    #[error("game \"{game}\": {outcome} entry sets advances_unlock but only wins may advance")]
    AdvanceOnNonWin { game: String, outcome: OutcomeKind },
    #[error("game \"{game}\": step thresholds must be strictly ascending")]
    UnorderedSteps { game: String },
    #[error("game \"{game}\": speed bonus divisor must be positive")]
    InvalidBonusDivisor { game: String },
    #[error("game \"{game}\": no reward entry covers {outcome} (difficulty {difficulty:?}, mode {mode:?})")]
    UncoveredOutcome {
        game: String,
        outcome: OutcomeKind,
        difficulty: Option<String>,
        mode: Option<String>,
    },
}

/// The full set of games known to the economy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameCatalog {
    #[serde(default)]
    pub games: Vec<GameConfig>,
}

impl GameCatalog {
    /// Build and validate a catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] describing the first violated invariant.
    pub fn new(games: Vec<GameConfig>) -> Result<Self, CatalogError> {
        let catalog = Self { games };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Look up a game by identifier.
    #[must_use]
    pub fn find(&self, game_id: &str) -> Option<&GameConfig> {
        self.games.iter().find(|game| game.id == game_id)
    }

    /// Parse the embedded catalog data without validating it.
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_GAMES_DATA).unwrap_or_default()
    }

    /// Check every catalog invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (idx, game) in self.games.iter().enumerate() {
            if self.games[..idx].iter().any(|other| other.id == game.id) {
                return Err(CatalogError::DuplicateGame(game.id.clone()));
            }
            validate_game(game)?;
        }
        Ok(())
    }
}

fn validate_game(game: &GameConfig) -> Result<(), CatalogError> {
    for entry in &game.rewards.entries {
        if let Some(difficulty) = entry.difficulty.as_deref() {
            if game.difficulties.ordinal_of(difficulty).is_none() {
                return Err(CatalogError::UnknownEntryDifficulty {
                    game: game.id.clone(),
                    difficulty: difficulty.to_string(),
                });
            }
        }
        if let Some(mode) = entry.mode.as_deref() {
            if !game.modes.iter().any(|m| m == mode) {
                return Err(CatalogError::UnknownEntryMode {
                    game: game.id.clone(),
                    mode: mode.to_string(),
                });
            }
        }
        if entry.advances_unlock && entry.outcome != OutcomeKind::Win {
            return Err(CatalogError::AdvanceOnNonWin {
                game: game.id.clone(),
                outcome: entry.outcome,
            });
        }
        match &entry.payout {
            Payout::Steps { steps, .. } => {
                let ascending = steps.windows(2).all(|pair| pair[0].below < pair[1].below);
                if !ascending {
                    return Err(CatalogError::UnorderedSteps {
                        game: game.id.clone(),
                    });
                }
            }
            Payout::SpeedBonus { bonus_divisor, .. } => {
                if *bonus_divisor <= 0.0 {
                    return Err(CatalogError::InvalidBonusDivisor {
                        game: game.id.clone(),
                    });
                }
            }
            Payout::Fixed { .. } | Payout::Scaled { .. } => {}
        }
    }

    // Every declared combination must be priced.
    let difficulties: Vec<Option<&str>> = if game.difficulties.is_empty() {
        vec![None]
    } else {
        game.difficulties.iter().map(Some).collect()
    };
    let modes: Vec<Option<&str>> = if game.modes.is_empty() {
        vec![None]
    } else {
        game.modes.iter().map(|m| Some(m.as_str())).collect()
    };
    for &outcome in &game.outcomes {
        for &difficulty in &difficulties {
            for &mode in &modes {
                if game.rewards.find_entry(outcome, difficulty, mode).is_none() {
                    return Err(CatalogError::UncoveredOutcome {
                        game: game.id.clone(),
                        outcome,
                        difficulty: difficulty.map(ToString::to_string),
                        mode: mode.map(ToString::to_string),
                    });
                }
            }
        }
    }
    Ok(())
}

/// The built-in Arcadia game catalog, validated once on first use.
#[must_use]
pub fn default_game_catalog() -> &'static GameCatalog {
    static CATALOG: OnceLock<GameCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let catalog = GameCatalog::load_from_static();
        catalog
            .validate()
            .expect("embedded game catalog is well-formed");
        catalog
    })
}
