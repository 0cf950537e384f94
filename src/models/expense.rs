use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::split::ExpenseSplit;
use crate::money::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseStatus {
    Draft,
    Confirmed,
    Cancelled,
    Deleted,
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExpenseStatus::Draft => "DRAFT",
            ExpenseStatus::Confirmed => "CONFIRMED",
            ExpenseStatus::Cancelled => "CANCELLED",
            ExpenseStatus::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Entertainment,
    Utilities,
    Shopping,
    Other,
}

/// An expense and its splits form one consistency unit; splits never
/// outlive the expense and are persisted together with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub payer_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    pub status: ExpenseStatus,
    pub splits: Vec<ExpenseSplit>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every write; storage rejects stale updates.
    pub version: u64,
}

impl Expense {
    /// True iff the expense is confirmed and every split is settled.
    pub fn is_fully_settled(&self) -> bool {
        self.status == ExpenseStatus::Confirmed
            && !self.splits.is_empty()
            && self.splits.iter().all(|s| s.settled)
    }

    /// Sum of the unsettled split amounts.
    pub fn unsettled_amount(&self) -> Money {
        let sum: Decimal = self
            .splits
            .iter()
            .filter(|s| !s.settled)
            .map(|s| s.amount.amount())
            .sum();
        Money::new(sum, self.amount.currency().clone())
    }

    pub fn split_for(&self, user_id: Uuid) -> Option<&ExpenseSplit> {
        self.splits.iter().find(|s| s.user_id == user_id)
    }
}
