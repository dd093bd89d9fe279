use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistSource {
    pub url: String,
}

/// 單一來源的下載結果；失敗時 `domains` 為空
#[derive(Debug, Clone, Default)]
pub struct SourceFetch {
    pub url: String,
    pub domains: BTreeSet<String>,
    pub error: Option<String>,
}

impl SourceFetch {
    pub fn ok(url: impl Into<String>, domains: BTreeSet<String>) -> Self {
        Self {
            url: url.into(),
            domains,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            domains: BTreeSet::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncInput {
    pub sources: Vec<SourceFetch>,
    pub current: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub desired_count: usize,
    pub current_count: usize,
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub removals_suppressed: bool,
    pub source_errors: Vec<SourceError>,
    pub sources_ok: usize,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub url: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainOperation {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFailure {
    pub domain: String,
    pub operation: DomainOperation,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub profile_id: String,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub desired_count: usize,
    pub current_count: usize,
    pub planned_additions: usize,
    pub planned_removals: usize,
    pub added: usize,
    pub removed: usize,
    pub removals_suppressed: bool,
    pub source_errors: Vec<SourceError>,
    pub failures: Vec<DomainFailure>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
