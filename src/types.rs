use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's three-bucket balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// The opaque ID of the user owning this balance.
    pub user_id: String,
    /// Deposited, withdrawable principal.
    pub main_balance: Decimal,
    /// Bonus funds that can only be released through the roulette.
    pub locked_bonus: Decimal,
    /// Withdrawable rewards from completed quests.
    pub quest_earnings: Decimal,
    /// Advisory tier, stored but never derived.
    pub investment_tier: i32,
    /// Whether the first-deposit bonus has already been paid out.
    #[serde(skip)]
    pub bonus_granted: bool,
    /// The last daily quest reset crossed by this user.
    pub last_daily_reset: DateTime<Utc>,
}

/// The kind of a daily quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Video,
    Quiz,
    Link,
    Referral,
}

impl QuestKind {
    /// Every kind, in the order a daily batch is generated.
    pub const ALL: [QuestKind; 4] = [
        QuestKind::Video,
        QuestKind::Quiz,
        QuestKind::Link,
        QuestKind::Referral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestKind::Video => "video",
            QuestKind::Quiz => "quiz",
            QuestKind::Link => "link",
            QuestKind::Referral => "referral",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            QuestKind::Video => "Watch Sponsor Video",
            QuestKind::Quiz => "Daily Trading Quiz",
            QuestKind::Link => "Visit Partner Site",
            QuestKind::Referral => "Share with a Friend",
        }
    }
}

/// A daily quest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    /// The ID of the quest.
    pub id: i64,
    /// The ID of the user the quest belongs to.
    pub user_id: String,
    /// The kind of the quest.
    #[serde(rename = "type")]
    pub kind: QuestKind,
    /// Human readable description.
    pub description: String,
    /// Reward credited on completion, frozen at generation time.
    pub reward_amount: Decimal,
    /// Whether the quest has been completed.
    pub is_completed: bool,
    /// When the quest was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the quest was generated.
    pub created_at: DateTime<Utc>,
}

/// A quest about to be generated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuest {
    pub kind: QuestKind,
    pub description: String,
    pub reward_amount: Decimal,
}

/// The kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    BonusUnlock,
    QuestReward,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::BonusUnlock => "bonus_unlock",
            TransactionKind::QuestReward => "quest_reward",
        }
    }
}

/// The status of a ledger entry. Only `Completed` is written today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// Error returned when a stored enum value is not recognised.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! impl_text_enum {
    ($ty:ty, $name:literal, [$($variant:ident),+]) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == <$ty>::$variant.as_str() {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(UnknownVariant { kind: $name, value: s.to_string() })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_text_enum!(QuestKind, "quest kind", [Video, Quiz, Link, Referral]);
impl_text_enum!(
    TransactionKind,
    "transaction kind",
    [Deposit, Withdrawal, BonusUnlock, QuestReward]
);
impl_text_enum!(
    TransactionStatus,
    "transaction status",
    [Pending, Completed, Failed]
);

/// An entry of the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the entry.
    pub id: i64,
    /// The ID of the user the entry belongs to.
    pub user_id: String,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The amount moved.
    pub amount: Decimal,
    /// Processing status.
    pub status: TransactionStatus,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// A ledger entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn completed(kind: TransactionKind, amount: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount,
            status: TransactionStatus::Completed,
            created_at,
        }
    }
}

/// The outcome of a roulette spin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouletteOutcome {
    /// Whether the stake was won.
    pub won: bool,
    /// Amount moved into the main balance, zero on a loss.
    pub amount: Decimal,
    /// The balance after the spin.
    pub new_balance: Balance,
}

/// Read-only summary shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub balance: Balance,
    pub completed_quests_count: usize,
    pub total_quests_count: usize,
    /// The next UTC midnight, identical for every user.
    pub next_reset_time: DateTime<Utc>,
}

/// A page of ledger history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// One-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 50;
    pub const MAX_PER_PAGE: u32 = 200;

    /// Builds a page from optional query values, clamping them into range.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
