use crate::error::CollectError;
use crate::rate::RateLimiter;
use crate::summary::Summary;
use crate::writer::{OutputPaths, write_records};
use chrono::Utc;
use harvest_common::{DateWindow, Platform, Record};
use harvest_config::HarvestConfig;
use harvest_http::HttpClient;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Settings every collector of one run shares.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub window: DateWindow,
    pub rate: RateLimiter,
    pub output_dir: PathBuf,
    pub dataset: String,
    pub dedupe: bool,
    pub timeout: Duration,
    pub retries: usize,
}

impl RunContext {
    pub fn from_config(cfg: &HarvestConfig) -> Result<Self, CollectError> {
        Ok(Self {
            window: cfg.date_range.window()?,
            rate: RateLimiter::per_interval(Duration::from_millis(cfg.collection.delay_ms)),
            output_dir: cfg.output.dir.clone(),
            dataset: cfg.output.dataset.clone(),
            dedupe: cfg.collection.dedupe,
            timeout: Duration::from_secs(cfg.collection.timeout_secs),
            retries: cfg.collection.retries,
        })
    }

    /// HTTP client for `base` with the run's timeout, retry budget and agent.
    pub fn http_client(&self, base: &str, user_agent: Option<&str>) -> Result<HttpClient, CollectError> {
        let client = HttpClient::new(base)
            .map_err(|e| CollectError::Setup(format!("{base}: {e}")))?
            .with_timeout(self.timeout)
            .with_retries(self.retries);
        Ok(match user_agent {
            Some(ua) => client.with_user_agent(ua),
            None => client,
        })
    }

    /// `<platform>_<dataset>`
    pub fn stem(&self, platform: Platform) -> String {
        format!("{}_{}", platform.as_str(), self.dataset)
    }

    /// Drop repeated ids (first occurrence wins) when de-duplication is on.
    pub fn dedupe<R: Record>(&self, records: Vec<R>) -> Vec<R> {
        if !self.dedupe {
            return records;
        }
        let before = records.len();
        let mut seen = HashSet::new();
        let kept: Vec<R> = records.into_iter().filter(|r| seen.insert(r.id())).collect();
        if kept.len() < before {
            tracing::info!(target: "collect", dropped = before - kept.len(), "collect.deduped");
        }
        kept
    }

    /// Write data files and the summary for one record set; returns every
    /// path written.
    pub fn write_output<R: Record>(&self, stem: &str, records: &[R]) -> Result<Vec<PathBuf>, CollectError> {
        let OutputPaths { json, csv } = write_records(&self.output_dir, stem, records)?;
        let summary = Summary::of(records, Utc::now()).write(&self.output_dir, stem)?;
        Ok(vec![json, csv, summary])
    }
}
