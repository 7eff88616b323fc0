//! The balance store: lazy creation, the daily quest reset and the bucket
//! arithmetic every other operation builds on.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::accounts::Accounts;
use crate::error::LedgerError;
use crate::quests::quest_batch;
use crate::store::UserTx;
use crate::types::Balance;
use crate::{FIRST_DEPOSIT_BONUS_PERCENT, MAX_BALANCE, percent_of};

impl Balance {
    /// A fresh, empty balance.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            main_balance: Decimal::ZERO,
            locked_bonus: Decimal::ZERO,
            quest_earnings: Decimal::ZERO,
            investment_tier: 0,
            bonus_granted: false,
            last_daily_reset: now,
        }
    }

    /// Funds that may leave through a withdrawal. The locked bonus never counts.
    pub fn withdrawable(&self) -> Decimal {
        self.main_balance.saturating_add(self.quest_earnings)
    }

    pub fn total(&self) -> Decimal {
        self.main_balance
            .saturating_add(self.locked_bonus)
            .saturating_add(self.quest_earnings)
    }

    /// Checks that adding `extra` keeps the sum of all buckets within
    /// [`MAX_BALANCE`], which in turn bounds every single bucket.
    fn ensure_room_for(&self, extra: Decimal) -> Result<(), LedgerError> {
        self.main_balance
            .checked_add(self.locked_bonus)
            .and_then(|v| v.checked_add(self.quest_earnings))
            .and_then(|v| v.checked_add(extra))
            .filter(|v| *v <= MAX_BALANCE)
            .map(|_| ())
            .ok_or(LedgerError::BalanceLimitExceeded)
    }

    /// Whether `now` falls on a later UTC calendar day than the last reset.
    pub fn reset_due(&self, now: DateTime<Utc>) -> bool {
        self.last_daily_reset.date_naive() != now.date_naive()
    }

    /// Credits a deposit and, on the first one ever, the locked bonus.
    /// Returns the bonus granted. Leaves the balance untouched on error.
    pub fn apply_deposit(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        let bonus = if self.bonus_granted {
            Decimal::ZERO
        } else {
            percent_of(amount, FIRST_DEPOSIT_BONUS_PERCENT)
                .ok_or(LedgerError::BalanceLimitExceeded)?
        };
        let credit = amount
            .checked_add(bonus)
            .ok_or(LedgerError::BalanceLimitExceeded)?;
        self.ensure_room_for(credit)?;

        self.bonus_granted = true;
        self.main_balance += amount;
        self.locked_bonus += bonus;
        Ok(bonus)
    }

    /// Adds a quest reward to the quest earnings.
    pub fn credit_quest_reward(&mut self, reward: Decimal) -> Result<(), LedgerError> {
        self.ensure_room_for(reward)?;
        self.quest_earnings += reward;
        Ok(())
    }

    /// Debits quest earnings first, then the main balance.
    pub fn apply_withdrawal(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let available = self.withdrawable();
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let from_quests = amount.min(self.quest_earnings);
        self.quest_earnings -= from_quests;
        self.main_balance -= amount - from_quests;
        Ok(())
    }

    /// Settles the whole locked bonus. Returns the amount moved to the main
    /// balance, which is zero on a loss.
    pub fn settle_stake(&mut self, won: bool) -> Result<Decimal, LedgerError> {
        let stake = self.locked_bonus;
        if won {
            self.main_balance = self
                .main_balance
                .checked_add(stake)
                .ok_or(LedgerError::BalanceLimitExceeded)?;
        }
        self.locked_bonus = Decimal::ZERO;
        Ok(if won { stake } else { Decimal::ZERO })
    }
}

impl Accounts {
    /// Returns the user's balance, creating it and running the daily reset
    /// when needed.
    pub async fn balance(&self, user_id: &str) -> Result<Balance, LedgerError> {
        let mut tx = self.store.begin(user_id).await?;
        let balance = self.ensure_current(tx.as_mut()).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Materializes the user's balance and quest batch inside `tx` and brings
    /// them up to the current UTC day. Idempotent within a day.
    pub(crate) async fn ensure_current(&self, tx: &mut dyn UserTx) -> Result<Balance, LedgerError> {
        let now = self.clock.now();

        match tx.balance().await? {
            None => {
                let balance = Balance::new(tx.user_id(), now);
                tx.insert_balance(&balance).await?;
                tx.replace_quests(&quest_batch(balance.main_balance)?, now)
                    .await?;
                info!(user_id = %balance.user_id, "initialized balance and quests");
                Ok(balance)
            }
            Some(mut balance) if balance.reset_due(now) => {
                tx.replace_quests(&quest_batch(balance.main_balance)?, now)
                    .await?;
                debug!(
                    user_id = %balance.user_id,
                    last_reset = %balance.last_daily_reset,
                    "daily quest reset"
                );
                balance.last_daily_reset = now;
                tx.update_balance(&balance).await?;
                Ok(balance)
            }
            Some(balance) => Ok(balance),
        }
    }
}
