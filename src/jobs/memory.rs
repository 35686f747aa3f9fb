//! Process-local job store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{JobId, JobRecord, JobStore};

/// `HashMap` behind an async `RwLock`. Lost on restart, never evicted.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    records: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, record: JobRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn contains(&self, id: &JobId) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}
