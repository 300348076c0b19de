use crate::error::CollectError;
use crate::writer::write_json_file;
use chrono::{DateTime, Utc};
use harvest_common::{DateWindow, Platform, Record};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSpan {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// Per-output overview written next to the data files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub platform: Platform,
    pub total_records: usize,
    pub date_range: DateSpan,
    pub unique_sources: usize,
    pub unique_authors: usize,
    pub collection_date: DateTime<Utc>,
}

impl Summary {
    pub fn of<R: Record>(records: &[R], collection_date: DateTime<Utc>) -> Self {
        let earliest = records.iter().map(|r| r.timestamp()).min();
        let latest = records.iter().map(|r| r.timestamp()).max();
        let sources: HashSet<&str> = records.iter().map(|r| r.source()).collect();
        let authors: HashSet<&str> = records.iter().filter_map(|r| r.author()).collect();
        Self {
            platform: R::PLATFORM,
            total_records: records.len(),
            date_range: DateSpan { earliest, latest },
            unique_sources: sources.len(),
            unique_authors: authors.len(),
            collection_date,
        }
    }

    /// `<dir>/<stem>_summary.json`
    pub fn write(&self, dir: &Path, stem: &str) -> Result<PathBuf, CollectError> {
        let path = dir.join(format!("{stem}_summary.json"));
        write_json_file(&path, self)?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Failed,
    Skipped,
}

/// One platform's line in the combined report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformRun {
    pub platform: Platform,
    pub status: RunStatus,
    pub records: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformRun {
    pub fn ok(platform: Platform, records: usize, files: Vec<PathBuf>) -> Self {
        Self {
            platform,
            status: RunStatus::Ok,
            records,
            files,
            error: None,
        }
    }

    pub fn failed(platform: Platform, error: impl ToString) -> Self {
        Self {
            platform,
            status: RunStatus::Failed,
            records: 0,
            files: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn skipped(platform: Platform, reason: impl ToString) -> Self {
        Self {
            platform,
            status: RunStatus::Skipped,
            records: 0,
            files: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

/// `collection_summary.json`, written by the `all` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub collection_date: DateTime<Utc>,
    pub dataset: String,
    pub window: DateWindow,
    pub platforms: Vec<PlatformRun>,
    pub total_records: usize,
}

impl CollectionSummary {
    pub fn new(
        dataset: impl Into<String>,
        window: DateWindow,
        platforms: Vec<PlatformRun>,
        collection_date: DateTime<Utc>,
    ) -> Self {
        let total_records = platforms.iter().map(|p| p.records).sum();
        Self {
            collection_date,
            dataset: dataset.into(),
            window,
            platforms,
            total_records,
        }
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf, CollectError> {
        let path = dir.join("collection_summary.json");
        write_json_file(&path, self)?;
        Ok(path)
    }
}
