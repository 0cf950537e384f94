use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitType {
    Equal,
    Percentage,
    ExactAmount,
    Shares,
}

/// One participant's share of one expense. The creditor is always the
/// owning expense's payer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub user_id: Uuid,
    pub amount: Money,
    pub split_type: SplitType,
    /// Only meaningful for [`SplitType::Percentage`], in [0, 100].
    pub percentage: Option<Decimal>,
    pub settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub settled_by: Option<Uuid>,
    pub settlement_note: Option<String>,
}
