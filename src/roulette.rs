use rust_decimal::Decimal;
use tracing::info;

use crate::accounts::Accounts;
use crate::error::LedgerError;
use crate::types::{NewTransaction, RouletteOutcome, TransactionKind};

impl Accounts {
    /// Stakes the entire locked bonus on one fair coin flip. A win moves it
    /// to the main balance; a loss forfeits it. Either way the locked bucket
    /// ends empty.
    pub async fn play_roulette(&self, user_id: &str) -> Result<RouletteOutcome, LedgerError> {
        let mut tx = self.store.begin(user_id).await?;
        let mut balance = self.ensure_current(tx.as_mut()).await?;

        if balance.locked_bonus <= Decimal::ZERO {
            return Err(LedgerError::NoLockedBonus);
        }

        let stake = balance.locked_bonus;
        let won = self.coin.flip();
        let amount = balance.settle_stake(won)?;

        tx.update_balance(&balance).await?;
        if won {
            tx.append(NewTransaction::completed(
                TransactionKind::BonusUnlock,
                amount,
                self.clock.now(),
            ))
            .await?;
        }
        tx.commit().await?;

        info!(user_id, won, %stake, "roulette settled");
        Ok(RouletteOutcome {
            won,
            amount,
            new_balance: balance,
        })
    }
}
