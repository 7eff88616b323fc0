use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::store::Store;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// Source of roulette outcomes.
pub trait Coin: Send + Sync {
    /// Returns `true` when the player wins.
    fn flip(&self) -> bool;
}

/// An unbiased coin backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct FairCoin;

impl Coin for FairCoin {
    fn flip(&self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }
}

impl<F> Coin for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn flip(&self) -> bool {
        self()
    }
}

/// Entry point for every balance, quest, wallet and roulette operation.
///
/// The operations themselves live next to the concern they implement
/// (`balances`, `quests`, `wallet`, `roulette`, `ledger`, `dashboard`).
#[derive(Clone)]
pub struct Accounts {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) coin: Arc<dyn Coin>,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            coin: Arc::new(FairCoin),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_coin(mut self, coin: impl Coin + 'static) -> Self {
        self.coin = Arc::new(coin);
        self
    }
}
