use async_trait::async_trait;

use crate::error::LedgerError;
use crate::models::ActivityEntry;

/// Fire-and-forget notification collaborator. The service logs a failure
/// and moves on; a sink error never rolls back a state transition.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<(), LedgerError>;
}

pub mod in_memory;
