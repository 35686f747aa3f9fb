//! Selection Resolver
//!
//! Turns a submitted selection into a resolved job, reports job status and
//! guards asset retrieval behind per-job access grants.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::assets::AssetStore;
use crate::auth::TokenIssuer;
use crate::catalog::{AssetName, CatalogIndex, CatalogSchema, DimensionValue, SelectionKey};
use crate::error::{ServiceError, ServiceResult};
use crate::jobs::{JobId, JobOutcome, JobRecord, JobStore, MissReason};

/// Submitted selection: one named field per catalog dimension.
///
/// Unknown fields are ignored. Required-ness is checked against the schema
/// in [`SelectionRequest::to_key`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionRequest {
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl SelectionRequest {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    /// Build the composite key in schema order.
    pub fn to_key(&self, schema: &CatalogSchema) -> ServiceResult<SelectionKey> {
        let mut missing = Vec::new();
        let mut values = Vec::with_capacity(schema.arity());

        for dim in &schema.dimensions {
            match self.fields.get(&dim.name).and_then(Value::as_str) {
                Some(v) if !v.trim().is_empty() => values.push(v),
                _ => missing.push(dim.name.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(ServiceError::ValidationFailure(format!(
                "Missing fields: {}",
                missing.join("/")
            )));
        }

        values
            .into_iter()
            .map(|v| {
                DimensionValue::new(v).map_err(|_| {
                    ServiceError::ValidationFailure(format!("Invalid selection value '{}'", v))
                })
            })
            .collect::<ServiceResult<Vec<_>>>()
            .map(SelectionKey::new)
    }
}

/// Externally visible job state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending { job_id: String },
    NoSequence { job_id: String },
    Done { job_id: String, video_url: String },
}

/// A retrieval that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDelivery {
    pub asset: AssetName,
    pub path: PathBuf,
}

pub struct SelectionResolver {
    index: Arc<CatalogIndex>,
    jobs: Arc<dyn JobStore>,
    assets: AssetStore,
    tokens: TokenIssuer,
}

impl SelectionResolver {
    pub fn new(
        index: Arc<CatalogIndex>,
        jobs: Arc<dyn JobStore>,
        assets: AssetStore,
        tokens: TokenIssuer,
    ) -> Self {
        Self { index, jobs, assets, tokens }
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    /// Resolve a selection and record the outcome. Always yields a job id
    /// unless the request itself is malformed.
    pub async fn submit(&self, subject: &str, request: &SelectionRequest) -> ServiceResult<JobId> {
        let key = request.to_key(self.index.schema())?;
        let id = JobId::new();

        let outcome = match self.index.lookup(&key) {
            None => JobOutcome::NoSequence { reason: MissReason::NotIndexed },
            Some(asset) => match self.assets.locate(asset).await {
                Some(_) => JobOutcome::Ready {
                    asset: asset.clone(),
                    grant: self.tokens.issue_grant(subject, &id)?,
                },
                None => JobOutcome::NoSequence { reason: MissReason::AssetMissing },
            },
        };

        match &outcome {
            JobOutcome::Ready { asset, .. } => info!("Job {} resolved {} -> {}", id, key, asset),
            JobOutcome::NoSequence { reason: MissReason::AssetMissing } => {
                warn!("Job {}: {} is indexed but its asset is missing from the store", id, key)
            }
            JobOutcome::NoSequence { .. } => info!("Job {}: no sequence for {}", id, key),
            JobOutcome::Pending => {}
        }

        self.jobs.put(JobRecord::new(id, subject, key, outcome)).await?;
        Ok(id)
    }

    pub async fn status(&self, job_id: &str) -> ServiceResult<JobStatus> {
        let record = self.find(job_id).await?.ok_or_else(|| not_found("Job not found"))?;
        let job_id = record.id.to_string();

        Ok(match record.outcome {
            JobOutcome::Pending => JobStatus::Pending { job_id },
            JobOutcome::NoSequence { .. } => JobStatus::NoSequence { job_id },
            JobOutcome::Ready { grant, .. } => JobStatus::Done {
                video_url: format!("/video/{}?token={}", job_id, urlencoding::encode(&grant)),
                job_id,
            },
        })
    }

    /// Check the grant, then the job, then the file.
    pub async fn retrieve(&self, job_id: &str, grant: &str) -> ServiceResult<AssetDelivery> {
        self.tokens.verify_grant(grant, job_id)?;

        let record = self.find(job_id).await?.ok_or_else(|| not_found("Video not ready"))?;
        let asset = record.asset().ok_or_else(|| not_found("Video not ready"))?.clone();

        let path = self.assets.locate(&asset).await.ok_or_else(|| {
            warn!("Job {}: asset {} vanished from the store", record.id, asset);
            not_found("File missing on server")
        })?;

        Ok(AssetDelivery { asset, path })
    }

    async fn find(&self, job_id: &str) -> ServiceResult<Option<JobRecord>> {
        match job_id.parse::<JobId>() {
            Ok(id) => Ok(self.jobs.get(&id).await?),
            Err(_) => Ok(None),
        }
    }
}

fn not_found(reason: &str) -> ServiceError {
    ServiceError::NotFound(reason.to_string())
}
