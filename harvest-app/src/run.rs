use crate::cli::Command;
use anyhow::{Context, Result};
use harvest_common::Platform;
use harvest_config::HarvestConfig;
use harvest_pipeline::{PlatformRun, RunContext, RunStatus, build_plan, render_plan, run_all, run_platform, write_plan};

/// Execute one command against a validated configuration.
pub async fn execute(command: &Command, cfg: &HarvestConfig) -> Result<()> {
    let platform = match command {
        Command::Plan => return plan(cfg),
        Command::All => return all(cfg).await,
        Command::Reddit(_) => Platform::Reddit,
        Command::Youtube => Platform::Youtube,
        Command::Telegram => Platform::Telegram,
        Command::Twitter => Platform::Twitter,
    };
    let ctx = RunContext::from_config(cfg).context("building run context")?;

    let run = run_platform(platform, cfg, &ctx)
        .await
        .with_context(|| format!("{} collection failed", platform.display_name()))?;
    report(&run);
    if run.status == RunStatus::Skipped {
        anyhow::bail!(
            "{} is not configured; add a `{}` section to the configuration",
            platform.display_name(),
            platform.as_str()
        );
    }
    Ok(())
}

async fn all(cfg: &HarvestConfig) -> Result<()> {
    let ctx = RunContext::from_config(cfg).context("building run context")?;
    let summary = run_all(cfg, &ctx).await.context("combined collection")?;
    for run in &summary.platforms {
        report(run);
    }
    println!("Total records: {}", summary.total_records);
    println!("Summary: {}", ctx.output_dir.join("collection_summary.json").display());
    Ok(())
}

fn plan(cfg: &HarvestConfig) -> Result<()> {
    let plans = build_plan(cfg);
    print!("{}", render_plan(&plans));
    let files = write_plan(&plans, &cfg.output.dir).context("writing plan files")?;
    for file in files {
        println!("Configuration saved to: {}", file.display());
    }
    Ok(())
}

fn report(run: &PlatformRun) {
    let name = run.platform.display_name();
    match run.status {
        RunStatus::Ok => {
            println!("{name}: {} records", run.records);
            for file in &run.files {
                println!("  {}", file.display());
            }
        }
        RunStatus::Failed => println!("{name}: failed: {}", run.error.as_deref().unwrap_or("unknown error")),
        RunStatus::Skipped => println!("{name}: skipped"),
    }
}
