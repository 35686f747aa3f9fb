//! Job records and the store interface.
//!
//! A job is created for every submitted selection and resolved before the
//! submitting request returns. Records live in process memory only.

mod memory;

pub use memory::InMemoryJobStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::catalog::{AssetName, SelectionKey};

/// Opaque job handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Why a selection produced no asset. Kept for diagnostics only; callers
/// see the same "no sequence" outcome either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// No catalog entry for the key.
    NotIndexed,
    /// Indexed, but the file is absent from the asset store.
    AssetMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobOutcome {
    Pending,
    Ready { asset: AssetName, grant: String },
    NoSequence { reason: MissReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub subject: String,
    pub selection: SelectionKey,
    pub outcome: JobOutcome,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: JobId, subject: impl Into<String>, selection: SelectionKey, outcome: JobOutcome) -> Self {
        Self {
            id,
            subject: subject.into(),
            selection,
            outcome,
            created_at: Utc::now(),
        }
    }

    pub fn asset(&self) -> Option<&AssetName> {
        match &self.outcome {
            JobOutcome::Ready { asset, .. } => Some(asset),
            _ => None,
        }
    }
}

/// Storage for job records.
///
/// `put` must be atomic per record: a reader sees either nothing or the
/// whole record.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, record: JobRecord) -> Result<()>;

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>>;

    async fn contains(&self, id: &JobId) -> Result<bool>;

    async fn len(&self) -> Result<usize>;
}
