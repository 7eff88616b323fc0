use crate::accounts::Accounts;
use crate::error::LedgerError;
use crate::types::{Page, Transaction};

impl Accounts {
    /// One page of the user's ledger, newest first, with the total entry count.
    ///
    /// Reading history does not materialize a balance for unknown users.
    pub async fn history(
        &self,
        user_id: &str,
        page: Page,
    ) -> Result<(Vec<Transaction>, u64), LedgerError> {
        Ok(self.store.history(user_id, page).await?)
    }
}
