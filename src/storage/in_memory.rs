use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{Expense, Group, GroupMember, Role, SettleUp, User};
use crate::storage::Storage;

/// HashMap-backed storage for tests and embedding. Each collection sits
/// behind its own mutex; the version check in `update_*` is performed
/// while the collection lock is held.
pub struct InMemoryStorage {
    users: Mutex<HashMap<Uuid, User>>,
    groups: Mutex<HashMap<Uuid, Group>>,
    members: Mutex<Vec<GroupMember>>,
    expenses: Mutex<HashMap<Uuid, Expense>>,
    settlements: Mutex<HashMap<Uuid, SettleUp>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            users: Mutex::new(HashMap::new()),
            groups: Mutex::new(HashMap::new()),
            members: Mutex::new(Vec::new()),
            expenses: Mutex::new(HashMap::new()),
            settlements: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, user: User) -> Result<User, LedgerError> {
        let mut users = self.users.lock().await;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, LedgerError> {
        Ok(self.users.lock().await.get(&user_id).cloned())
    }

    async fn create_group(&self, group: Group) -> Result<Group, LedgerError> {
        let mut groups = self.groups.lock().await;
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, LedgerError> {
        Ok(self.groups.lock().await.get(&group_id).cloned())
    }

    async fn add_member(&self, member: GroupMember) -> Result<(), LedgerError> {
        self.members.lock().await.push(member);
        Ok(())
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, LedgerError> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id))
    }

    async fn member_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Role>, LedgerError> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .map(|m| m.role.clone()))
    }

    async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMember>, LedgerError> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn create_expense(&self, expense: Expense) -> Result<Expense, LedgerError> {
        let mut expenses = self.expenses.lock().await;
        expenses.insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn update_expense(
        &self,
        expense: Expense,
        expected_version: u64,
    ) -> Result<Expense, LedgerError> {
        let mut expenses = self.expenses.lock().await;
        let stored = expenses
            .get(&expense.id)
            .ok_or(LedgerError::ExpenseNotFound(expense.id))?;
        if stored.version != expected_version {
            return Err(LedgerError::StaleVersion {
                entity: "Expense",
                id: expense.id,
            });
        }
        expenses.insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, LedgerError> {
        Ok(self.expenses.lock().await.get(&expense_id).cloned())
    }

    async fn list_group_expenses(&self, group_id: Uuid) -> Result<Vec<Expense>, LedgerError> {
        Ok(self
            .expenses
            .lock()
            .await
            .values()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn create_settlement(&self, settlement: SettleUp) -> Result<SettleUp, LedgerError> {
        let mut settlements = self.settlements.lock().await;
        settlements.insert(settlement.id, settlement.clone());
        Ok(settlement)
    }

    async fn update_settlement(
        &self,
        settlement: SettleUp,
        expected_version: u64,
    ) -> Result<SettleUp, LedgerError> {
        let mut settlements = self.settlements.lock().await;
        let stored = settlements
            .get(&settlement.id)
            .ok_or(LedgerError::SettlementNotFound(settlement.id))?;
        if stored.version != expected_version {
            return Err(LedgerError::StaleVersion {
                entity: "Settlement",
                id: settlement.id,
            });
        }
        settlements.insert(settlement.id, settlement.clone());
        Ok(settlement)
    }

    async fn get_settlement(
        &self,
        settlement_id: Uuid,
    ) -> Result<Option<SettleUp>, LedgerError> {
        Ok(self.settlements.lock().await.get(&settlement_id).cloned())
    }

    async fn list_group_settlements(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<SettleUp>, LedgerError> {
        Ok(self
            .settlements
            .lock()
            .await
            .values()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect())
    }
}
