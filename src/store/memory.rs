use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{Store, UserTx};
use crate::types::{Balance, NewQuest, NewTransaction, Page, Quest, Transaction};

#[derive(Debug, Clone, Default)]
struct UserRows {
    balance: Option<Balance>,
    quests: Vec<Quest>,
    transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct Sequences {
    quest: AtomicI64,
    transaction: AtomicI64,
}

impl Sequences {
    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Process-local store. Each user's rows sit behind their own async mutex.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<HashMap<String, Arc<AsyncMutex<UserRows>>>>>,
    sequences: Arc<Sequences>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self, user_id: &str) -> Result<Arc<AsyncMutex<UserRows>>> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(users.entry(user_id.to_string()).or_default().clone())
    }

    fn existing_rows(&self, user_id: &str) -> Result<Option<Arc<AsyncMutex<UserRows>>>> {
        let users = self
            .users
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(users.get(user_id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self, user_id: &str) -> Result<Box<dyn UserTx>> {
        let guard = self.rows(user_id)?.lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryUserTx {
            user_id: user_id.to_string(),
            guard,
            work,
            sequences: self.sequences.clone(),
        }))
    }

    async fn history(&self, user_id: &str, page: Page) -> Result<(Vec<Transaction>, u64)> {
        let Some(rows) = self.existing_rows(user_id)? else {
            return Ok((Vec::new(), 0));
        };
        let rows = rows.lock().await;

        let mut entries = rows.transactions.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = entries.len() as u64;
        let entries = entries
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .collect();
        Ok((entries, total))
    }
}

struct MemoryUserTx {
    user_id: String,
    guard: OwnedMutexGuard<UserRows>,
    work: UserRows,
    sequences: Arc<Sequences>,
}

#[async_trait]
impl UserTx for MemoryUserTx {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn balance(&mut self) -> Result<Option<Balance>> {
        Ok(self.work.balance.clone())
    }

    async fn insert_balance(&mut self, balance: &Balance) -> Result<()> {
        if self.work.balance.is_some() {
            return Err(anyhow!("balance for user {} already exists", self.user_id));
        }
        self.work.balance = Some(balance.clone());
        Ok(())
    }

    async fn update_balance(&mut self, balance: &Balance) -> Result<()> {
        match self.work.balance.as_mut() {
            Some(current) => {
                *current = balance.clone();
                Ok(())
            }
            None => Err(anyhow!("no balance for user {}", self.user_id)),
        }
    }

    async fn quests(&mut self) -> Result<Vec<Quest>> {
        Ok(self.work.quests.clone())
    }

    async fn quest(&mut self, quest_id: i64) -> Result<Option<Quest>> {
        Ok(self.work.quests.iter().find(|q| q.id == quest_id).cloned())
    }

    async fn replace_quests(
        &mut self,
        batch: &[NewQuest],
        now: DateTime<Utc>,
    ) -> Result<Vec<Quest>> {
        self.work.quests = batch
            .iter()
            .map(|q| Quest {
                id: Sequences::next(&self.sequences.quest),
                user_id: self.user_id.clone(),
                kind: q.kind,
                description: q.description.clone(),
                reward_amount: q.reward_amount,
                is_completed: false,
                completed_at: None,
                created_at: now,
            })
            .collect();
        Ok(self.work.quests.clone())
    }

    async fn complete_quest(&mut self, quest_id: i64, at: DateTime<Utc>) -> Result<Option<Quest>> {
        let quest = self
            .work
            .quests
            .iter_mut()
            .find(|q| q.id == quest_id && !q.is_completed);
        Ok(quest.map(|q| {
            q.is_completed = true;
            q.completed_at = Some(at);
            q.clone()
        }))
    }

    async fn append(&mut self, entry: NewTransaction) -> Result<Transaction> {
        let transaction = Transaction {
            id: Sequences::next(&self.sequences.transaction),
            user_id: self.user_id.clone(),
            kind: entry.kind,
            amount: entry.amount,
            status: entry.status,
            created_at: entry.created_at,
        };
        self.work.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUserTx {
            mut guard, work, ..
        } = *self;
        *guard = work;
        Ok(())
    }
}
