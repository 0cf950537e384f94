use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
    Cancelled,
}

impl SettlementStatus {
    /// Terminal states are final; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementStatus::Completed | SettlementStatus::Rejected | SettlementStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SettlementStatus::Pending => "PENDING",
            SettlementStatus::InProgress => "IN_PROGRESS",
            SettlementStatus::Completed => "COMPLETED",
            SettlementStatus::Rejected => "REJECTED",
            SettlementStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    MobilePayment,
    Other,
}

/// A debt-payoff request between two users in a group. It references the
/// same debt the unsettled splits describe but never mutates them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettleUp {
    pub id: Uuid,
    pub group_id: Uuid,
    /// Who owes and is paying.
    pub payer_id: Uuid,
    /// Who is owed and receives.
    pub payee_id: Uuid,
    pub amount: Money,
    pub status: SettlementStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub initiated_by: Uuid,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub external_txn_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every write; storage rejects stale updates.
    pub version: u64,
}
