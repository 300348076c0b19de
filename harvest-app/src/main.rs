use anyhow::{Context, Result};
use clap::Parser;
use harvest_common::observability::{LogConfig, init_logging};
use harvest_config::{DEFAULT_CONFIG_FILE, HarvestConfig, HarvestConfigLoader};

mod cli;
mod run;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // credentials usually live in .env; a missing file is fine
    let _ = dotenvy::dotenv();

    let cfg = load_config(&cli)?;

    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::info!(
        target: "harvest",
        command = ?cli.command,
        dataset = %cfg.output.dataset,
        output = %cfg.output.dir.display(),
        log = %log_path.display(),
        "harvest.start"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let result = runtime.block_on(run::execute(&cli.command, &cfg));
    if let Err(err) = &result {
        tracing::error!(target: "harvest", error = format!("{err:#}"), "harvest.failed");
    }
    result
}

fn load_config(cli: &Cli) -> Result<HarvestConfig> {
    let loader = match &cli.config {
        Some(path) => HarvestConfigLoader::new().with_file(path),
        None => HarvestConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("loading configuration")?;
    cli.apply_overrides(&mut cfg);
    cfg.validate().context("checking configuration")?;
    Ok(cfg)
}
