//! Dispatch by platform and the combined `all` run.
use crate::context::RunContext;
use crate::error::CollectError;
use crate::summary::{CollectionSummary, PlatformRun};
use crate::{reddit, telegram, twitter, youtube};
use chrono::Utc;
use harvest_common::Platform;
use harvest_config::HarvestConfig;

/// Run one platform. A platform without a configuration section is
/// reported as skipped rather than failed.
pub async fn run_platform(
    platform: Platform,
    cfg: &HarvestConfig,
    ctx: &RunContext,
) -> Result<PlatformRun, CollectError> {
    tracing::info!(target: "collect", %platform, dataset = %ctx.dataset, "collect.start");
    let run = match platform {
        Platform::Reddit => match &cfg.reddit {
            Some(c) => reddit::run_reddit(c, ctx).await?,
            None => PlatformRun::skipped(platform, "no reddit section"),
        },
        Platform::Youtube => match &cfg.youtube {
            Some(c) => youtube::run_youtube(c, ctx).await?,
            None => PlatformRun::skipped(platform, "no youtube section"),
        },
        Platform::Telegram => match &cfg.telegram {
            Some(c) => telegram::run_telegram(c, ctx).await?,
            None => PlatformRun::skipped(platform, "no telegram section"),
        },
        Platform::Twitter => match &cfg.twitter {
            Some(c) => twitter::run_twitter(c, ctx).await?,
            None => PlatformRun::skipped(platform, "no twitter section"),
        },
    };
    tracing::info!(
        target: "collect",
        %platform,
        status = ?run.status,
        records = run.records,
        "collect.done"
    );
    Ok(run)
}

/// Every configured platform in turn. A failing platform is recorded and
/// the next one still runs; `collection_summary.json` is written last.
pub async fn run_all(cfg: &HarvestConfig, ctx: &RunContext) -> Result<CollectionSummary, CollectError> {
    let mut runs = Vec::new();
    for platform in cfg.configured_platforms() {
        match run_platform(platform, cfg, ctx).await {
            Ok(run) => runs.push(run),
            Err(err) => {
                tracing::error!(target: "collect", %platform, error = %err, "collect.failed");
                runs.push(PlatformRun::failed(platform, err));
            }
        }
    }
    let summary = CollectionSummary::new(ctx.dataset.clone(), ctx.window, runs, Utc::now());
    let path = summary.write(&ctx.output_dir)?;
    tracing::info!(
        target: "collect",
        total = summary.total_records,
        path = %path.display(),
        "collect.summary_written"
    );
    Ok(summary)
}
