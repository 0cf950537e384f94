use std::collections::HashMap;

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::activity::ActivitySink;
use crate::allocator::{self, SplitStrategy};
use crate::clock::Clock;
use crate::error::LedgerError;
use crate::models::{
    ActivityEntry, ActivityKind, Expense, ExpenseCategory, ExpenseSplit, ExpenseStatus, Group,
    PaymentMethod, Role, SettleUp, SettlementStatus, SplitType, User,
};
use crate::money::Money;
use crate::storage::Storage;

/// Field edits for [`LedgerService::update_expense`]; `None` leaves the
/// field unchanged.
#[derive(Clone, Debug, Default)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub category: Option<ExpenseCategory>,
    pub notes: Option<String>,
}

/// Per-member aggregate for a group balances view.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberBalance {
    pub user_id: Uuid,
    /// What this member still owes other members.
    pub owes: Money,
    /// What other members still owe this member.
    pub owed: Money,
    /// `owed - owes`; positive means the member is a net creditor.
    pub net: Money,
}

/// One suggested transfer in a minimal settlement plan.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementSuggestion {
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub amount: Money,
}

pub struct LedgerService<S, A, C> {
    pub storage: S,
    pub activity: A,
    pub clock: C,
}

impl<S: Storage, A: ActivitySink, C: Clock> LedgerService<S, A, C> {
    pub fn new(storage: S, activity: A, clock: C) -> Self {
        info!("Initializing LedgerService");
        LedgerService {
            storage,
            activity,
            clock,
        }
    }

    // EXPENSE LEDGER

    pub async fn create_expense(
        &self,
        group_id: Uuid,
        payer_id: Uuid,
        description: String,
        amount: Money,
        category: ExpenseCategory,
        strategy: SplitStrategy,
        created_by: Uuid,
    ) -> Result<Expense, LedgerError> {
        info!(
            "Creating expense in group {} paid by {} for {}",
            group_id, payer_id, amount
        );
        let group = self.require_group(group_id).await?;
        if amount.currency() != &group.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: group.currency.clone(),
                actual: amount.currency().clone(),
            });
        }
        self.require_user(payer_id).await?;
        self.require_member(group_id, payer_id).await?;
        self.require_user(created_by).await?;
        self.require_member(group_id, created_by).await?;
        for user_id in strategy.participants() {
            self.require_user(user_id).await?;
            self.require_member(group_id, user_id).await?;
        }

        let allocations = allocator::allocate(&amount, &strategy)?;

        let now = self.clock.now();
        let expense_id = Uuid::new_v4();
        let splits: Vec<ExpenseSplit> = allocations
            .into_iter()
            .map(|a| ExpenseSplit {
                id: Uuid::new_v4(),
                expense_id,
                user_id: a.user_id,
                amount: a.amount,
                split_type: a.split_type,
                percentage: a.percentage,
                settled: false,
                settled_at: None,
                settled_by: None,
                settlement_note: None,
            })
            .collect();

        let expense = Expense {
            id: expense_id,
            group_id,
            payer_id,
            description,
            amount,
            category,
            notes: None,
            status: ExpenseStatus::Confirmed,
            splits,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let created = self.storage.create_expense(expense).await?;
        debug!("Expense created with ID: {}", created.id);

        self.notify(ActivityEntry::new(
            created_by,
            group_id,
            ActivityKind::ExpenseCreated,
            &json!({ "expense_id": created.id, "amount": created.amount }),
            now,
        ))
        .await;

        Ok(created)
    }

    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        changes: ExpenseUpdate,
        actor: Uuid,
    ) -> Result<Expense, LedgerError> {
        info!("Updating expense {} by user {}", expense_id, actor);
        let mut expense = self.require_expense(expense_id).await?;
        self.require_member(expense.group_id, actor).await?;
        if expense.is_fully_settled() {
            warn!("Expense {} is fully settled; update rejected", expense_id);
            return Err(LedgerError::ExpenseSettled(expense_id));
        }
        if expense.status != ExpenseStatus::Confirmed {
            return Err(LedgerError::ExpenseNotEditable {
                expense: expense_id,
                status: expense.status,
            });
        }

        let expected_version = expense.version;
        if let Some(description) = changes.description {
            expense.description = description;
        }
        if let Some(category) = changes.category {
            expense.category = category;
        }
        if let Some(notes) = changes.notes {
            expense.notes = Some(notes);
        }
        if let Some(new_amount) = changes.amount {
            if new_amount.currency() != expense.amount.currency() {
                return Err(LedgerError::CurrencyMismatch {
                    expected: expense.amount.currency().clone(),
                    actual: new_amount.currency().clone(),
                });
            }
            if !new_amount.is_positive() {
                return Err(LedgerError::NonPositiveAmount(new_amount.amount()));
            }
            if new_amount != expense.amount {
                Self::recalculate_splits(&mut expense, &new_amount)?;
                expense.amount = new_amount;
            }
        }

        let now = self.clock.now();
        expense.updated_at = now;
        expense.updated_by = actor;
        expense.version += 1;

        let saved = self.storage.update_expense(expense, expected_version).await?;
        debug!("Expense {} updated to version {}", saved.id, saved.version);

        self.notify(ActivityEntry::new(
            actor,
            saved.group_id,
            ActivityKind::ExpenseUpdated,
            &json!({ "expense_id": saved.id, "amount": saved.amount }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn delete_expense(
        &self,
        expense_id: Uuid,
        actor: Uuid,
    ) -> Result<Expense, LedgerError> {
        info!("Deleting expense {} by user {}", expense_id, actor);
        let mut expense = self.require_expense(expense_id).await?;
        self.require_member(expense.group_id, actor).await?;
        if expense.is_fully_settled() {
            warn!("Expense {} is fully settled; delete rejected", expense_id);
            return Err(LedgerError::ExpenseSettled(expense_id));
        }
        if expense.status == ExpenseStatus::Deleted {
            return Err(LedgerError::ExpenseNotEditable {
                expense: expense_id,
                status: expense.status,
            });
        }

        let expected_version = expense.version;
        let now = self.clock.now();
        expense.status = ExpenseStatus::Deleted;
        expense.updated_at = now;
        expense.updated_by = actor;
        expense.version += 1;

        // Soft delete; splits stay behind for audit history
        let saved = self.storage.update_expense(expense, expected_version).await?;
        debug!("Expense {} soft deleted", saved.id);

        self.notify(ActivityEntry::new(
            actor,
            saved.group_id,
            ActivityKind::ExpenseDeleted,
            &json!({ "expense_id": saved.id }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn settle_split(
        &self,
        expense_id: Uuid,
        debtor: Uuid,
        actor: Uuid,
        note: Option<String>,
    ) -> Result<Expense, LedgerError> {
        info!(
            "Settling split for user {} on expense {} by {}",
            debtor, expense_id, actor
        );
        let mut expense = self.require_expense(expense_id).await?;
        if expense.status != ExpenseStatus::Confirmed {
            return Err(LedgerError::ExpenseNotEditable {
                expense: expense_id,
                status: expense.status,
            });
        }
        self.authorize_split_action(&expense, debtor, actor, "settle this split")
            .await?;

        let expected_version = expense.version;
        let now = self.clock.now();
        let group_id = expense.group_id;
        let split = expense
            .splits
            .iter_mut()
            .find(|s| s.user_id == debtor)
            .ok_or(LedgerError::SplitNotFound {
                expense: expense_id,
                user: debtor,
            })?;
        if split.settled {
            return Err(LedgerError::SplitAlreadySettled {
                expense: expense_id,
                user: debtor,
            });
        }
        split.settled = true;
        split.settled_at = Some(now);
        split.settled_by = Some(actor);
        split.settlement_note = note;

        expense.updated_at = now;
        expense.updated_by = actor;
        expense.version += 1;

        let saved = self.storage.update_expense(expense, expected_version).await?;
        debug!("Split settled on expense {}", saved.id);

        self.notify(ActivityEntry::new(
            actor,
            group_id,
            ActivityKind::SplitSettled,
            &json!({ "expense_id": saved.id, "user_id": debtor }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn unsettle_split(
        &self,
        expense_id: Uuid,
        debtor: Uuid,
        actor: Uuid,
    ) -> Result<Expense, LedgerError> {
        info!(
            "Unsettling split for user {} on expense {} by {}",
            debtor, expense_id, actor
        );
        let mut expense = self.require_expense(expense_id).await?;
        if expense.status != ExpenseStatus::Confirmed {
            return Err(LedgerError::ExpenseNotEditable {
                expense: expense_id,
                status: expense.status,
            });
        }
        self.authorize_split_action(&expense, debtor, actor, "unsettle this split")
            .await?;

        let expected_version = expense.version;
        let now = self.clock.now();
        let group_id = expense.group_id;
        let split = expense
            .splits
            .iter_mut()
            .find(|s| s.user_id == debtor)
            .ok_or(LedgerError::SplitNotFound {
                expense: expense_id,
                user: debtor,
            })?;
        if !split.settled {
            return Err(LedgerError::SplitNotSettled {
                expense: expense_id,
                user: debtor,
            });
        }
        split.settled = false;
        split.settled_at = None;
        split.settled_by = None;
        split.settlement_note = None;

        expense.updated_at = now;
        expense.updated_by = actor;
        expense.version += 1;

        let saved = self.storage.update_expense(expense, expected_version).await?;
        debug!("Split unsettled on expense {}", saved.id);

        self.notify(ActivityEntry::new(
            actor,
            group_id,
            ActivityKind::SplitUnsettled,
            &json!({ "expense_id": saved.id, "user_id": debtor }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn is_fully_settled(&self, expense_id: Uuid) -> Result<bool, LedgerError> {
        Ok(self.require_expense(expense_id).await?.is_fully_settled())
    }

    pub async fn unsettled_amount(&self, expense_id: Uuid) -> Result<Money, LedgerError> {
        Ok(self.require_expense(expense_id).await?.unsettled_amount())
    }

    /// Re-derives split amounts after an amount edit. A pure-equal split
    /// set is re-derived over the same participants; anything else is
    /// rescaled by `new / old`, with the last split absorbing the rounding
    /// residual so the sum stays exactly equal to the new total. Settled
    /// flags and split identity are preserved either way.
    fn recalculate_splits(expense: &mut Expense, new_amount: &Money) -> Result<(), LedgerError> {
        if expense
            .splits
            .iter()
            .all(|s| s.split_type == SplitType::Equal)
        {
            let participants: Vec<Uuid> = expense.splits.iter().map(|s| s.user_id).collect();
            let allocations = allocator::allocate_equal(new_amount, &participants)?;
            for (split, allocation) in expense.splits.iter_mut().zip(allocations) {
                split.amount = allocation.amount;
            }
            return Ok(());
        }

        let old_total = expense.amount.amount();
        let count = expense.splits.len();
        let mut allocated = Money::zero(new_amount.currency().clone());
        for (idx, split) in expense.splits.iter_mut().enumerate() {
            let amount = if idx + 1 == count {
                new_amount.checked_sub(&allocated)?
            } else {
                split.amount.ratio(new_amount.amount(), old_total)?
            };
            allocated = allocated.checked_add(&amount)?;
            split.amount = amount;
        }
        for split in &expense.splits {
            if !split.amount.is_positive() {
                return Err(LedgerError::AllocationRoundsToZero {
                    user: split.user_id,
                });
            }
        }
        Ok(())
    }

    // SETTLEMENT STATE MACHINE

    pub async fn create_settlement(
        &self,
        group_id: Uuid,
        payer_id: Uuid,
        payee_id: Uuid,
        amount: Money,
        payment_method: PaymentMethod,
        notes: Option<String>,
        initiated_by: Uuid,
    ) -> Result<SettleUp, LedgerError> {
        info!(
            "Creating settlement in group {}: {} pays {} {}",
            group_id, payer_id, payee_id, amount
        );
        let group = self.require_group(group_id).await?;
        if payer_id == payee_id {
            return Err(LedgerError::SelfSettlement(payer_id));
        }
        if amount.currency() != &group.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: group.currency.clone(),
                actual: amount.currency().clone(),
            });
        }
        if !amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(amount.amount()));
        }
        for user_id in [payer_id, payee_id, initiated_by] {
            self.require_user(user_id).await?;
            self.require_member(group_id, user_id).await?;
        }

        let now = self.clock.now();
        let settlement = SettleUp {
            id: Uuid::new_v4(),
            group_id,
            payer_id,
            payee_id,
            amount,
            status: SettlementStatus::Pending,
            payment_method,
            notes,
            initiated_by,
            confirmed_at: None,
            confirmed_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
            external_txn_ref: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let created = self.storage.create_settlement(settlement).await?;
        debug!("Settlement created with ID: {}", created.id);

        self.notify(ActivityEntry::new(
            initiated_by,
            group_id,
            ActivityKind::SettlementCreated,
            &json!({ "settlement_id": created.id, "amount": created.amount }),
            now,
        ))
        .await;

        Ok(created)
    }

    pub async fn confirm_settlement(
        &self,
        settlement_id: Uuid,
        confirming_user: Uuid,
        external_txn_ref: Option<String>,
    ) -> Result<SettleUp, LedgerError> {
        info!(
            "Confirming settlement {} by user {}",
            settlement_id, confirming_user
        );
        let mut settlement = self.require_settlement(settlement_id).await?;
        if !matches!(
            settlement.status,
            SettlementStatus::Pending | SettlementStatus::InProgress
        ) {
            return Err(LedgerError::InvalidTransition {
                settlement: settlement_id,
                status: settlement.status,
                action: "confirm",
            });
        }
        let allowed = confirming_user == settlement.payee_id
            || self.is_admin(settlement.group_id, confirming_user).await?;
        if !allowed {
            warn!(
                "User {} may not confirm settlement {}",
                confirming_user, settlement_id
            );
            return Err(LedgerError::NotAuthorized {
                user: confirming_user,
                action: "confirm this settlement",
            });
        }

        let expected_version = settlement.version;
        let now = self.clock.now();
        settlement.status = SettlementStatus::Completed;
        settlement.confirmed_at = Some(now);
        settlement.confirmed_by = Some(confirming_user);
        settlement.external_txn_ref = external_txn_ref;
        settlement.updated_at = now;
        settlement.version += 1;

        let saved = self
            .persist_transition(settlement, expected_version, "confirm")
            .await?;

        self.notify(ActivityEntry::new(
            confirming_user,
            saved.group_id,
            ActivityKind::SettlementConfirmed,
            &json!({ "settlement_id": saved.id }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn reject_settlement(
        &self,
        settlement_id: Uuid,
        rejecting_user: Uuid,
        reason: String,
    ) -> Result<SettleUp, LedgerError> {
        info!(
            "Rejecting settlement {} by user {}",
            settlement_id, rejecting_user
        );
        let mut settlement = self.require_settlement(settlement_id).await?;
        if settlement.status != SettlementStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                settlement: settlement_id,
                status: settlement.status,
                action: "reject",
            });
        }
        if rejecting_user != settlement.payer_id && rejecting_user != settlement.payee_id {
            warn!(
                "User {} may not reject settlement {}",
                rejecting_user, settlement_id
            );
            return Err(LedgerError::NotAuthorized {
                user: rejecting_user,
                action: "reject this settlement",
            });
        }

        let expected_version = settlement.version;
        let now = self.clock.now();
        settlement.status = SettlementStatus::Rejected;
        settlement.rejected_at = Some(now);
        settlement.rejected_by = Some(rejecting_user);
        settlement.rejection_reason = Some(reason);
        settlement.updated_at = now;
        settlement.version += 1;

        let saved = self
            .persist_transition(settlement, expected_version, "reject")
            .await?;

        self.notify(ActivityEntry::new(
            rejecting_user,
            saved.group_id,
            ActivityKind::SettlementRejected,
            &json!({ "settlement_id": saved.id, "reason": saved.rejection_reason }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn mark_settlement_in_progress(
        &self,
        settlement_id: Uuid,
        user: Uuid,
    ) -> Result<SettleUp, LedgerError> {
        info!(
            "Marking settlement {} in progress by user {}",
            settlement_id, user
        );
        let mut settlement = self.require_settlement(settlement_id).await?;
        if settlement.status != SettlementStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                settlement: settlement_id,
                status: settlement.status,
                action: "mark in progress",
            });
        }
        self.require_member(settlement.group_id, user).await?;

        let expected_version = settlement.version;
        let now = self.clock.now();
        settlement.status = SettlementStatus::InProgress;
        settlement.updated_at = now;
        settlement.version += 1;

        let saved = self
            .persist_transition(settlement, expected_version, "mark in progress")
            .await?;

        self.notify(ActivityEntry::new(
            user,
            saved.group_id,
            ActivityKind::SettlementInProgress,
            &json!({ "settlement_id": saved.id }),
            now,
        ))
        .await;

        Ok(saved)
    }

    pub async fn cancel_settlement(
        &self,
        settlement_id: Uuid,
        user: Uuid,
    ) -> Result<SettleUp, LedgerError> {
        info!("Cancelling settlement {} by user {}", settlement_id, user);
        let mut settlement = self.require_settlement(settlement_id).await?;
        if settlement.status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                settlement: settlement_id,
                status: settlement.status,
                action: "cancel",
            });
        }
        let allowed =
            user == settlement.initiated_by || self.is_admin(settlement.group_id, user).await?;
        if !allowed {
            warn!("User {} may not cancel settlement {}", user, settlement_id);
            return Err(LedgerError::NotAuthorized {
                user,
                action: "cancel this settlement",
            });
        }

        let expected_version = settlement.version;
        let now = self.clock.now();
        settlement.status = SettlementStatus::Cancelled;
        settlement.updated_at = now;
        settlement.version += 1;

        let saved = self
            .persist_transition(settlement, expected_version, "cancel")
            .await?;

        self.notify(ActivityEntry::new(
            user,
            saved.group_id,
            ActivityKind::SettlementCancelled,
            &json!({ "settlement_id": saved.id }),
            now,
        ))
        .await;

        Ok(saved)
    }

    /// Exactly one concurrent transition wins; the loser re-reads the
    /// settlement and reports the state it lost to.
    async fn persist_transition(
        &self,
        settlement: SettleUp,
        expected_version: u64,
        action: &'static str,
    ) -> Result<SettleUp, LedgerError> {
        let id = settlement.id;
        match self.storage.update_settlement(settlement, expected_version).await {
            Ok(saved) => Ok(saved),
            Err(LedgerError::StaleVersion { .. }) => {
                let current = self.require_settlement(id).await?;
                warn!(
                    "Settlement {} lost a concurrent transition; now {}",
                    id, current.status
                );
                Err(LedgerError::InvalidTransition {
                    settlement: id,
                    status: current.status,
                    action,
                })
            }
            Err(err) => Err(err),
        }
    }

    // BALANCE NETTING
    //
    // Balances derive only from unsettled splits of confirmed expenses.
    // Settlements are a parallel ledger and never feed in here.

    pub async fn total_owed_by_user(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Money, LedgerError> {
        let group = self.require_group(group_id).await?;
        let mut total = Money::zero(group.currency.clone());
        for expense in self.storage.list_group_expenses(group_id).await? {
            if expense.status != ExpenseStatus::Confirmed {
                continue;
            }
            for split in &expense.splits {
                if split.settled || split.user_id != user_id || split.user_id == expense.payer_id
                {
                    continue;
                }
                total = total.checked_add(&split.amount)?;
            }
        }
        debug!("User {} owes {} in group {}", user_id, total, group_id);
        Ok(total)
    }

    /// Positive means `user_b` net-owes `user_a`.
    pub async fn net_balance(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        group_id: Uuid,
    ) -> Result<Money, LedgerError> {
        let group = self.require_group(group_id).await?;
        let mut net = Money::zero(group.currency.clone());
        if user_a == user_b {
            return Ok(net);
        }
        for expense in self.storage.list_group_expenses(group_id).await? {
            if expense.status != ExpenseStatus::Confirmed {
                continue;
            }
            for split in &expense.splits {
                if split.settled {
                    continue;
                }
                if expense.payer_id == user_a && split.user_id == user_b {
                    net = net.checked_add(&split.amount)?;
                } else if expense.payer_id == user_b && split.user_id == user_a {
                    net = net.checked_sub(&split.amount)?;
                }
            }
        }
        Ok(net)
    }

    pub async fn group_balances(&self, group_id: Uuid) -> Result<Vec<MemberBalance>, LedgerError> {
        let group = self.require_group(group_id).await?;
        let members = self.storage.list_members(group_id).await?;
        let currency = group.currency;

        let mut owes: HashMap<Uuid, Decimal> = HashMap::new();
        let mut owed: HashMap<Uuid, Decimal> = HashMap::new();
        for expense in self.storage.list_group_expenses(group_id).await? {
            if expense.status != ExpenseStatus::Confirmed {
                continue;
            }
            for split in &expense.splits {
                if split.settled || split.user_id == expense.payer_id {
                    continue;
                }
                *owes.entry(split.user_id).or_insert(Decimal::ZERO) += split.amount.amount();
                *owed.entry(expense.payer_id).or_insert(Decimal::ZERO) += split.amount.amount();
            }
        }

        let mut balances: Vec<MemberBalance> = members
            .iter()
            .map(|m| {
                let o = owes.get(&m.user_id).copied().unwrap_or(Decimal::ZERO);
                let d = owed.get(&m.user_id).copied().unwrap_or(Decimal::ZERO);
                MemberBalance {
                    user_id: m.user_id,
                    owes: Money::new(o, currency.clone()),
                    owed: Money::new(d, currency.clone()),
                    net: Money::new(d - o, currency.clone()),
                }
            })
            .collect();
        balances.sort_by_key(|b| b.user_id);

        debug!(
            "Balances calculated for group {}: {} members",
            group_id,
            balances.len()
        );
        Ok(balances)
    }

    /// Greedy creditor/debtor matching over the net balances; produces a
    /// small transfer list that clears every net position.
    pub async fn suggest_settlements(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<SettlementSuggestion>, LedgerError> {
        let group = self.require_group(group_id).await?;
        let balances = self.group_balances(group_id).await?;

        let mut creditors: Vec<(Uuid, Decimal)> = balances
            .iter()
            .filter(|b| b.net.is_positive())
            .map(|b| (b.user_id, b.net.amount()))
            .collect();
        let mut debtors: Vec<(Uuid, Decimal)> = balances
            .iter()
            .filter(|b| b.net.is_negative())
            .map(|b| (b.user_id, -b.net.amount()))
            .collect();
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        debtors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut suggestions = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < debtors.len() && j < creditors.len() {
            let settled = debtors[i].1.min(creditors[j].1);
            if settled > Decimal::ZERO {
                suggestions.push(SettlementSuggestion {
                    from_user: debtors[i].0,
                    to_user: creditors[j].0,
                    amount: Money::new(settled, group.currency.clone()),
                });
            }
            debtors[i].1 -= settled;
            creditors[j].1 -= settled;
            if debtors[i].1.is_zero() {
                i += 1;
            }
            if creditors[j].1.is_zero() {
                j += 1;
            }
        }

        debug!(
            "Suggested {} settlements for group {}",
            suggestions.len(),
            group_id
        );
        Ok(suggestions)
    }

    // GUARD HELPERS

    async fn require_user(&self, user_id: Uuid) -> Result<User, LedgerError> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    async fn require_group(&self, group_id: Uuid) -> Result<Group, LedgerError> {
        self.storage
            .get_group(group_id)
            .await?
            .ok_or(LedgerError::GroupNotFound(group_id))
    }

    async fn require_expense(&self, expense_id: Uuid) -> Result<Expense, LedgerError> {
        self.storage
            .get_expense(expense_id)
            .await?
            .ok_or(LedgerError::ExpenseNotFound(expense_id))
    }

    async fn require_settlement(&self, settlement_id: Uuid) -> Result<SettleUp, LedgerError> {
        self.storage
            .get_settlement(settlement_id)
            .await?
            .ok_or(LedgerError::SettlementNotFound(settlement_id))
    }

    async fn require_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), LedgerError> {
        if !self.storage.is_member(group_id, user_id).await? {
            warn!("User {} is not a member of group {}", user_id, group_id);
            return Err(LedgerError::NotGroupMember {
                user: user_id,
                group: group_id,
            });
        }
        Ok(())
    }

    async fn is_admin(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, LedgerError> {
        Ok(matches!(
            self.storage.member_role(group_id, user_id).await?,
            Some(Role::Admin)
        ))
    }

    async fn authorize_split_action(
        &self,
        expense: &Expense,
        debtor: Uuid,
        actor: Uuid,
        action: &'static str,
    ) -> Result<(), LedgerError> {
        let allowed = actor == expense.payer_id
            || actor == debtor
            || self.is_admin(expense.group_id, actor).await?;
        if !allowed {
            warn!(
                "User {} may not {} on expense {}",
                actor, action, expense.id
            );
            return Err(LedgerError::NotAuthorized {
                user: actor,
                action,
            });
        }
        Ok(())
    }

    async fn notify(&self, entry: ActivityEntry) {
        if let Err(err) = self.activity.record(entry).await {
            // Fire and forget; a sink failure never rolls back the transition
            warn!("Activity sink failed: {}", err);
        }
    }
}
