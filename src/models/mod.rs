pub mod activity;
pub mod expense;
pub mod group;
pub mod settlement;
pub mod split;
pub mod user;

pub use activity::{ActivityEntry, ActivityKind};
pub use expense::{Expense, ExpenseCategory, ExpenseStatus};
pub use group::{Group, GroupMember, Role};
pub use settlement::{PaymentMethod, SettleUp, SettlementStatus};
pub use split::{ExpenseSplit, SplitType};
pub use user::User;
