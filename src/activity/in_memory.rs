use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::activity::ActivitySink;
use crate::error::LedgerError;
use crate::models::ActivityEntry;

pub struct InMemoryActivitySink {
    entries: Mutex<Vec<ActivityEntry>>,
}

impl InMemoryActivitySink {
    pub fn new() -> Self {
        InMemoryActivitySink {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub async fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().await.clone()
    }
}

impl Default for InMemoryActivitySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivitySink for InMemoryActivitySink {
    async fn record(&self, entry: ActivityEntry) -> Result<(), LedgerError> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}
