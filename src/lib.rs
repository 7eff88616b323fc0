//! The ledger behind the quest investment app: three-bucket balances, daily
//! quests, deposits and withdrawals, and the locked-bonus roulette.

mod accounts;
mod api;
mod balances;
pub mod config;
mod dashboard;
mod error;
mod ledger;
mod quests;
mod responses;
mod roulette;
pub mod store;
mod types;
mod wallet;

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

pub use accounts::{Accounts, Clock, Coin, FairCoin, SystemClock};
pub use api::{AppState, init_router};
pub use dashboard::next_reset;
pub use error::LedgerError;
pub use quests::quest_batch;
pub use types::{
    Balance, Dashboard, NewQuest, NewTransaction, Page, Quest, QuestKind, RouletteOutcome,
    Transaction, TransactionKind, TransactionStatus,
};
pub use wallet::validate_amount;

use crate::config::{Config, StoreBackend};
use crate::store::{MemoryStore, PgStore, Store};

/// Share of the quest base paid by each daily quest.
pub const QUEST_REWARD_PERCENT: u32 = 35;
/// Share of the first deposit added to the locked bonus.
pub const FIRST_DEPOSIT_BONUS_PERCENT: u32 = 40;
/// Quest base used while a user has no main balance.
pub const QUEST_FALLBACK_BASE: i64 = 10_000;
/// Upper bound for a single amount and for the sum of a user's buckets,
/// 10^18 - 1, the largest whole value a `NUMERIC(20, 2)` column holds.
pub const MAX_BALANCE: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 0);

/// Initializes the database pool.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;
    Ok(pool)
}

/// Builds the configured store, migrating the schema when it is Postgres.
pub async fn init_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let store = PgStore::new(init_pool(url, config.max_connections).await?);
            store.migrate().await?;
            info!("using postgres store");
            Ok(Arc::new(store))
        }
    }
}

/// `percent` percent of `amount`, rounded to cents. `None` on overflow.
pub fn percent_of(amount: Decimal, percent: u32) -> Option<Decimal> {
    amount
        .checked_mul(Decimal::from(percent))?
        .checked_div(Decimal::ONE_HUNDRED)
        .map(|v| v.round_dp(wallet::AMOUNT_SCALE))
}
