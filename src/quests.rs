use rust_decimal::Decimal;
use tracing::info;

use crate::accounts::Accounts;
use crate::error::LedgerError;
use crate::types::{NewQuest, NewTransaction, Quest, QuestKind, TransactionKind};
use crate::{QUEST_FALLBACK_BASE, QUEST_REWARD_PERCENT, percent_of};

/// Builds a daily batch: one quest of every kind, each paying the same share
/// of `base`. A zero base falls back to [`QUEST_FALLBACK_BASE`].
pub fn quest_batch(base: Decimal) -> Result<Vec<NewQuest>, LedgerError> {
    let base = if base > Decimal::ZERO {
        base
    } else {
        Decimal::from(QUEST_FALLBACK_BASE)
    };
    let reward_amount =
        percent_of(base, QUEST_REWARD_PERCENT).ok_or(LedgerError::BalanceLimitExceeded)?;

    Ok(QuestKind::ALL
        .into_iter()
        .map(|kind| NewQuest {
            kind,
            description: kind.description().to_string(),
            reward_amount,
        })
        .collect())
}

impl Accounts {
    /// Lists the user's current quest batch.
    pub async fn quests(&self, user_id: &str) -> Result<Vec<Quest>, LedgerError> {
        let mut tx = self.store.begin(user_id).await?;
        self.ensure_current(tx.as_mut()).await?;
        let quests = tx.quests().await?;
        tx.commit().await?;
        Ok(quests)
    }

    /// Completes one of the user's quests and credits its frozen reward to
    /// the quest earnings. The quest flag, the credit and the ledger entry
    /// commit together or not at all.
    pub async fn complete_quest(&self, user_id: &str, quest_id: i64) -> Result<Quest, LedgerError> {
        let mut tx = self.store.begin(user_id).await?;
        let mut balance = self.ensure_current(tx.as_mut()).await?;

        let quest = tx
            .quest(quest_id)
            .await?
            .ok_or(LedgerError::QuestNotFound(quest_id))?;
        if quest.is_completed {
            return Err(LedgerError::QuestAlreadyCompleted(quest_id));
        }

        let now = self.clock.now();
        let quest = tx
            .complete_quest(quest_id, now)
            .await?
            .ok_or(LedgerError::QuestAlreadyCompleted(quest_id))?;

        balance.credit_quest_reward(quest.reward_amount)?;
        tx.update_balance(&balance).await?;
        tx.append(NewTransaction::completed(
            TransactionKind::QuestReward,
            quest.reward_amount,
            now,
        ))
        .await?;
        tx.commit().await?;

        info!(user_id, quest_id, reward = %quest.reward_amount, "quest completed");
        Ok(quest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_has_one_quest_of_each_kind() {
        let batch = quest_batch(Decimal::from(1000)).unwrap();
        let kinds: Vec<_> = batch.iter().map(|q| q.kind).collect();
        assert_eq!(kinds, QuestKind::ALL);
        assert!(batch.iter().all(|q| q.reward_amount == Decimal::from(350)));
    }

    #[test]
    fn empty_balance_uses_the_fallback_base() {
        let batch = quest_batch(Decimal::ZERO).unwrap();
        assert_eq!(batch.len(), 4);
        assert!(batch.iter().all(|q| q.reward_amount == Decimal::from(3500)));
    }

    #[test]
    fn rewards_are_rounded_to_cents() {
        // 33.33 * 0.35 = 11.6655
        let batch = quest_batch(Decimal::new(3333, 2)).unwrap();
        assert_eq!(batch[0].reward_amount, Decimal::new(1167, 2));
        assert_eq!(batch[0].reward_amount.to_string(), "11.67");
    }

    #[test]
    fn tiny_base_yields_zero_rewards() {
        let batch = quest_batch(Decimal::new(1, 2)).unwrap();
        assert!(batch.iter().all(|q| q.reward_amount == Decimal::ZERO));
    }

    #[test]
    fn oversized_base_is_an_error_not_a_panic() {
        assert!(matches!(
            quest_batch(Decimal::MAX),
            Err(LedgerError::BalanceLimitExceeded)
        ));
    }
}
