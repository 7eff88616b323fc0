use chrono::{DateTime, Days, NaiveTime, Utc};

use crate::accounts::Accounts;
use crate::error::LedgerError;
use crate::types::Dashboard;

/// The first UTC midnight strictly after `now`.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() + Days::new(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

impl Accounts {
    pub async fn dashboard(&self, user_id: &str) -> Result<Dashboard, LedgerError> {
        let mut tx = self.store.begin(user_id).await?;
        let balance = self.ensure_current(tx.as_mut()).await?;
        let quests = tx.quests().await?;
        tx.commit().await?;

        Ok(Dashboard {
            balance,
            completed_quests_count: quests.iter().filter(|q| q.is_completed).count(),
            total_quests_count: quests.len(),
            next_reset_time: next_reset(self.clock.now()),
        })
    }
}
