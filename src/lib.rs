pub mod activity;
pub mod allocator;
pub mod clock;
pub mod constants;
pub mod error;
pub mod models;
pub mod money;
pub mod service;
pub mod storage;

pub use activity::ActivitySink;
pub use activity::in_memory::InMemoryActivitySink;
pub use allocator::{Allocation, SplitStrategy, allocate};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, LedgerError};
pub use money::{Currency, Money};
pub use service::{ExpenseUpdate, LedgerService, MemberBalance, SettlementSuggestion};
pub use storage::Storage;
pub use storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests;
