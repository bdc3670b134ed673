//! Exactly-once reward settlement against the durable economy store.
//!
//! One session object guards one logical playthrough. The claim flag flips
//! synchronously before the first suspension point, so a second trigger
//! firing while the store write is still in flight (a re-rendered win check,
//! a timeout-based forced end) finds the session already spent. The runtime
//! is single-threaded and cooperative, which is what lets a plain boolean do
//! the job of a lock.
use crate::EconomyStore;
use crate::balance::{CoinFloor, PlayerEconomy};
use crate::ranks::{RankTable, RankTier};
use crate::reward::RewardResult;

/// Idempotence guard for one live game session. Not persisted: a page reload
/// produces a fresh, unclaimed session, so callers must not construct two
/// sessions for the same logical playthrough.
#[derive(Debug)]
pub struct RewardSettlementSession {
    account_id: String,
    game_id: String,
    claimed: bool,
}

/// How far the durable side of a settlement got.
#[derive(Debug)]
pub enum SyncState {
    /// The atomic increment succeeded.
    Durable,
    /// The increment failed but the read-then-overwrite fallback succeeded.
    Recovered,
    /// Both attempts failed; the optimistic local credit stands and the
    /// player should be told their progress may not have synced.
    LocalOnly(anyhow::Error),
}

impl SyncState {
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::Durable | Self::Recovered)
    }
}

/// What a settlement actually applied to the wallet.
#[derive(Debug)]
pub struct AppliedReward {
    /// Effective coin change after the floor policy, including any rank
    /// promotion bonus.
    pub coins_delta: i64,
    pub xp_delta: u32,
    /// Tier reached when this settlement crossed a rank threshold.
    pub promotion: Option<RankTier>,
    /// Wallet state after the local apply.
    pub balance: PlayerEconomy,
}

/// Result of a `settle` call.
#[derive(Debug)]
pub enum SettlementOutcome {
    /// First call on this session: the reward was applied.
    Settled {
        applied: AppliedReward,
        sync: SyncState,
    },
    /// Repeat call: nothing happened. Not a failure; callers may log it.
    AlreadyClaimed,
}

impl RewardSettlementSession {
    #[must_use]
    pub fn new(account_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            game_id: game_id.into(),
            claimed: false,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Whether this session has already paid out.
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Apply a reward exactly once.
    ///
    /// The local wallet update happens before any I/O and is never rolled
    /// back. The durable update is one atomic increment; on failure, one
    /// read-then-overwrite fallback. No retries beyond that, so a flaky
    /// store cannot cause duplicate writes or unbounded latency.
    pub async fn settle<S: EconomyStore>(
        &mut self,
        store: &S,
        ranks: &RankTable,
        floor: CoinFloor,
        economy: &mut PlayerEconomy,
        reward: &RewardResult,
    ) -> SettlementOutcome {
        if self.claimed {
            log::debug!(
                "settlement for {} session already claimed; ignoring repeat trigger",
                self.game_id
            );
            return SettlementOutcome::AlreadyClaimed;
        }
        self.claimed = true;

        let xp_before = economy.cumulative_xp;
        let xp_after = xp_before.saturating_add(u64::from(reward.xp_delta));
        let promotion = ranks.promotion_between(xp_before, xp_after).cloned();
        let bonus = promotion.as_ref().map_or(0, |tier| tier.promotion_bonus);
        let coins_delta = economy.apply(
            reward.coins_delta.saturating_add(bonus),
            reward.xp_delta,
            floor,
        );
        let applied = AppliedReward {
            coins_delta,
            xp_delta: reward.xp_delta,
            promotion,
            balance: *economy,
        };

        let sync = sync_remote(store, &self.account_id, coins_delta, reward.xp_delta).await;
        SettlementOutcome::Settled { applied, sync }
    }
}

async fn sync_remote<S: EconomyStore>(
    store: &S,
    account_id: &str,
    coins_delta: i64,
    xp_delta: u32,
) -> SyncState {
    match store.increment_balances(account_id, coins_delta, xp_delta).await {
        Ok(()) => SyncState::Durable,
        Err(err) => {
            log::warn!(
                "balance increment failed for {account_id}: {err}; falling back to overwrite"
            );
            match overwrite_with_deltas(store, account_id, coins_delta, xp_delta).await {
                Ok(()) => SyncState::Recovered,
                Err(fallback_err) => {
                    log::warn!("overwrite fallback failed for {account_id}: {fallback_err}");
                    SyncState::LocalOnly(fallback_err)
                }
            }
        }
    }
}

async fn overwrite_with_deltas<S: EconomyStore>(
    store: &S,
    account_id: &str,
    coins_delta: i64,
    xp_delta: u32,
) -> anyhow::Result<()> {
    let remote = store.fetch_balances(account_id).await?;
    let coins = remote.coins.saturating_add(coins_delta);
    let xp = remote.cumulative_xp.saturating_add(u64::from(xp_delta));
    store.overwrite_balances(account_id, coins, xp).await?;
    Ok(())
}
