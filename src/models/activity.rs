use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    ExpenseCreated,
    ExpenseUpdated,
    ExpenseDeleted,
    SplitSettled,
    SplitUnsettled,
    SettlementCreated,
    SettlementInProgress,
    SettlementConfirmed,
    SettlementRejected,
    SettlementCancelled,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub actor: Uuid,
    pub group_id: Uuid,
    pub kind: ActivityKind,
    pub payload: String,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityEntry {
    // Structured JSON payload so downstream consumers can render details
    pub fn new<T: Serialize>(
        actor: Uuid,
        group_id: Uuid,
        kind: ActivityKind,
        payload: &T,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        ActivityEntry {
            id: Uuid::new_v4(),
            actor,
            group_id,
            kind,
            payload: serde_json::to_string(payload).unwrap_or_default(),
            recorded_at,
        }
    }
}
