use async_trait::async_trait;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{Expense, Group, GroupMember, Role, SettleUp, User};

/// Persistence collaborator. An expense is always saved together with its
/// splits as one aggregate; `update_*` calls carry the version the caller
/// read and must fail with [`LedgerError::StaleVersion`] when it no longer
/// matches, so concurrent writers cannot interleave.
#[async_trait]
pub trait Storage: Send + Sync {
    // User/group directory
    async fn create_user(&self, user: User) -> Result<User, LedgerError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, LedgerError>;

    async fn create_group(&self, group: Group) -> Result<Group, LedgerError>;
    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, LedgerError>;
    async fn add_member(&self, member: GroupMember) -> Result<(), LedgerError>;
    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, LedgerError>;
    async fn member_role(&self, group_id: Uuid, user_id: Uuid)
    -> Result<Option<Role>, LedgerError>;
    async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMember>, LedgerError>;

    // Expense aggregates
    async fn create_expense(&self, expense: Expense) -> Result<Expense, LedgerError>;
    async fn update_expense(
        &self,
        expense: Expense,
        expected_version: u64,
    ) -> Result<Expense, LedgerError>;
    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, LedgerError>;
    async fn list_group_expenses(&self, group_id: Uuid) -> Result<Vec<Expense>, LedgerError>;

    // Settlements
    async fn create_settlement(&self, settlement: SettleUp) -> Result<SettleUp, LedgerError>;
    async fn update_settlement(
        &self,
        settlement: SettleUp,
        expected_version: u64,
    ) -> Result<SettleUp, LedgerError>;
    async fn get_settlement(&self, settlement_id: Uuid)
    -> Result<Option<SettleUp>, LedgerError>;
    async fn list_group_settlements(&self, group_id: Uuid)
    -> Result<Vec<SettleUp>, LedgerError>;
}

pub mod in_memory;
