use rust_decimal::Decimal;
use tracing::info;

use crate::accounts::Accounts;
use crate::error::LedgerError;
use crate::MAX_BALANCE;
use crate::types::{Balance, NewTransaction, TransactionKind};

/// Largest number of decimal places an amount may carry.
pub const AMOUNT_SCALE: u32 = 2;

/// Rejects zero, negative, sub-cent and out-of-range amounts.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO
        || amount > MAX_BALANCE
        || amount.normalize().scale() > AMOUNT_SCALE
    {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(amount)
}

impl Accounts {
    /// Deposits `amount` into the main balance. The first deposit a user ever
    /// makes also adds the bonus to the locked bucket.
    pub async fn deposit(&self, user_id: &str, amount: Decimal) -> Result<Balance, LedgerError> {
        let amount = validate_amount(amount)?;

        let mut tx = self.store.begin(user_id).await?;
        let mut balance = self.ensure_current(tx.as_mut()).await?;

        let bonus = balance.apply_deposit(amount)?;
        tx.update_balance(&balance).await?;
        tx.append(NewTransaction::completed(
            TransactionKind::Deposit,
            amount,
            self.clock.now(),
        ))
        .await?;
        tx.commit().await?;

        info!(user_id, %amount, %bonus, "deposit applied");
        Ok(balance)
    }

    /// Withdraws `amount` from quest earnings first and the main balance
    /// after that.
    pub async fn withdraw(&self, user_id: &str, amount: Decimal) -> Result<Balance, LedgerError> {
        let amount = validate_amount(amount)?;

        let mut tx = self.store.begin(user_id).await?;
        let mut balance = self.ensure_current(tx.as_mut()).await?;

        balance.apply_withdrawal(amount)?;
        tx.update_balance(&balance).await?;
        tx.append(NewTransaction::completed(
            TransactionKind::Withdrawal,
            amount,
            self.clock.now(),
        ))
        .await?;
        tx.commit().await?;

        info!(user_id, %amount, "withdrawal applied");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive_cents() {
        assert!(validate_amount(Decimal::from(10)).is_ok());
        assert!(validate_amount(Decimal::new(1, 2)).is_ok());
        assert!(validate_amount(Decimal::new(1000, 3)).is_ok());
        assert!(validate_amount(Decimal::new(1, 3)).is_err());
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(Decimal::from(-5)).is_err());
        assert!(validate_amount(MAX_BALANCE).is_ok());
        assert!(validate_amount(MAX_BALANCE + Decimal::ONE).is_err());
        assert!(validate_amount(Decimal::MAX).is_err());
    }
}
