//! Persistence for balances, quests and the ledger.
//!
//! Every mutation runs inside a [`UserTx`], a unit of work that holds one
//! user's rows exclusively. Writes become visible only on [`UserTx::commit`];
//! dropping the unit discards them.

mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::types::{Balance, NewQuest, NewTransaction, Page, Quest, Transaction};

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Opens a unit of work, waiting until no other unit holds `user_id`.
    async fn begin(&self, user_id: &str) -> Result<Box<dyn UserTx>>;

    /// Returns one page of the user's ledger, newest first, and the total entry count.
    async fn history(&self, user_id: &str, page: Page) -> Result<(Vec<Transaction>, u64)>;
}

#[async_trait]
pub trait UserTx: Send {
    fn user_id(&self) -> &str;

    async fn balance(&mut self) -> Result<Option<Balance>>;

    async fn insert_balance(&mut self, balance: &Balance) -> Result<()>;

    async fn update_balance(&mut self, balance: &Balance) -> Result<()>;

    async fn quests(&mut self) -> Result<Vec<Quest>>;

    /// Looks a quest up among the user's own quests.
    async fn quest(&mut self, quest_id: i64) -> Result<Option<Quest>>;

    /// Discards the user's current quest batch and stores `batch` in its place.
    async fn replace_quests(&mut self, batch: &[NewQuest], now: DateTime<Utc>)
    -> Result<Vec<Quest>>;

    /// Marks an open quest completed. Returns `None` if it is missing or already completed.
    async fn complete_quest(&mut self, quest_id: i64, at: DateTime<Utc>)
    -> Result<Option<Quest>>;

    async fn append(&mut self, entry: NewTransaction) -> Result<Transaction>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
