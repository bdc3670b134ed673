//! Arcadia Economy Engine
//!
//! Platform-agnostic reward and progression logic for the Arcadia web arcade.
//! This crate turns finished game sessions into coin/XP changes, derives rank
//! tiers from cumulative XP, gates difficulty levels behind frontier
//! victories, and settles each reward exactly once against a remote balance
//! store that the client does not fully control. Rendering, input, chat, and
//! the games' own win detection live elsewhere; they call into this crate.

pub mod balance;
pub mod catalog;
pub mod daily;
pub mod ranks;
pub mod reward;
pub mod settlement;
pub mod unlock;

// Re-export commonly used types
pub use balance::{CoinFloor, PlayerEconomy};
pub use catalog::{CatalogError, GameCatalog, GameConfig, default_game_catalog};
pub use daily::DailyLock;
pub use ranks::{RankTable, RankTableError, RankTier, default_rank_table};
pub use reward::{
    GameOutcomeFact, OutcomeKind, Payout, PayoutStep, RewardEntry, RewardError, RewardResult,
    RewardTable, StepPayout, compute_reward,
};
pub use settlement::{AppliedReward, RewardSettlementSession, SettlementOutcome, SyncState};
pub use unlock::{DifficultyLadder, UnlockState, frontier, is_unlocked, record_victory};

use async_trait::async_trait;

/// Trait for the durable balance store backing the economy.
/// Platform-specific implementations should provide this.
///
/// The runtime is single-threaded and cooperative, so implementations may
/// hold non-`Send` state (browser handles, `Rc` clients).
#[async_trait(?Send)]
pub trait EconomyStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Atomically add deltas to an account's balances. Must be a server-side
    /// increment, not a client-computed read-modify-write, so concurrent
    /// sessions on other devices cannot lose updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the increment cannot be applied.
    async fn increment_balances(
        &self,
        account_id: &str,
        coins_delta: i64,
        xp_delta: u32,
    ) -> Result<(), Self::Error>;

    /// Overwrite an account's balances with absolute values. Last-resort
    /// fallback when the atomic increment is unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn overwrite_balances(
        &self,
        account_id: &str,
        coins: i64,
        cumulative_xp: u64,
    ) -> Result<(), Self::Error>;

    /// Read an account's current durable balances.
    ///
    /// # Errors
    ///
    /// Returns an error if the balances cannot be read.
    async fn fetch_balances(&self, account_id: &str) -> Result<PlayerEconomy, Self::Error>;
}

/// Main entry point binding the game catalog, rank table, and durable store.
///
/// Everything is injected explicitly; there is no ambient account or session
/// state anywhere in the crate.
pub struct EconomyEngine<S>
where
    S: EconomyStore,
{
    store: S,
    catalog: GameCatalog,
    ranks: RankTable,
    floor: CoinFloor,
}

impl<S> EconomyEngine<S>
where
    S: EconomyStore,
{
    /// Create an engine with the provided store and configuration.
    pub const fn new(store: S, catalog: GameCatalog, ranks: RankTable) -> Self {
        Self {
            store,
            catalog,
            ranks,
            floor: CoinFloor::Unclamped,
        }
    }

    /// Create an engine with the built-in catalog and rank ladder.
    #[must_use]
    pub fn with_builtin_config(store: S) -> Self {
        Self::new(
            store,
            default_game_catalog().clone(),
            default_rank_table().clone(),
        )
    }

    /// Override the coin floor policy.
    #[must_use]
    pub fn with_coin_floor(mut self, floor: CoinFloor) -> Self {
        self.floor = floor;
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Configuration for one game.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownGame`] if the catalog has no such game.
    pub fn game(&self, game_id: &str) -> Result<&GameConfig, RewardError> {
        self.catalog
            .find(game_id)
            .ok_or_else(|| RewardError::UnknownGame(game_id.to_string()))
    }

    /// Price a finished session against its game's reward table.
    ///
    /// # Errors
    ///
    /// Returns a [`RewardError`] if the game is unknown or the fact cannot
    /// be priced.
    pub fn compute_reward(&self, fact: &GameOutcomeFact) -> Result<RewardResult, RewardError> {
        compute_reward(self.game(&fact.game_id)?, fact)
    }

    /// Open the settlement session for one logical playthrough. Callers must
    /// create exactly one session per playthrough; a fresh session is always
    /// unclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownGame`] if the catalog has no such game.
    pub fn begin_session(
        &self,
        account_id: &str,
        game_id: &str,
    ) -> Result<RewardSettlementSession, RewardError> {
        self.game(game_id)?;
        Ok(RewardSettlementSession::new(account_id, game_id))
    }

    /// Settle a reward through the session's idempotence guard.
    pub async fn settle(
        &self,
        session: &mut RewardSettlementSession,
        economy: &mut PlayerEconomy,
        reward: &RewardResult,
    ) -> SettlementOutcome {
        session
            .settle(&self.store, &self.ranks, self.floor, economy, reward)
            .await
    }

    /// Current rank tier for a wallet.
    #[must_use]
    pub fn rank_of(&self, economy: &PlayerEconomy) -> &RankTier {
        self.ranks.resolve(economy.cumulative_xp)
    }

    /// Progress toward the next tier, in percent.
    #[must_use]
    pub fn rank_progress(&self, economy: &PlayerEconomy) -> f64 {
        self.ranks.progress_to_next(economy.cumulative_xp)
    }
}
