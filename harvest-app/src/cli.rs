//! Command line surface of the `harvest` binary.
use clap::{Args, Parser, Subcommand, ValueEnum};
use harvest_common::observability::LogFormat;
use harvest_config::{HarvestConfig, RedditMode};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "harvest", version, about = "Collect public social media posts into JSON and CSV")]
pub struct Cli {
    /// Configuration file (default: ./harvest.yaml when present)
    #[arg(long, global = true, env = "HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the output files are written to (overrides output.dir)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Dataset name used in output file names (overrides output.dataset)
    #[arg(long, global = true)]
    pub dataset: Option<String>,

    /// Log encoding: text or json (overrides logging.format)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Subreddit posts from the public JSON endpoints
    Reddit(RedditArgs),
    /// Top-level comments on channel videos (YouTube Data API v3)
    Youtube,
    /// Public channel history (needs the `mtproto` build feature)
    Telegram,
    /// Recent tweets per keyword (Twitter API v2)
    Twitter,
    /// Every configured platform, then collection_summary.json
    All,
    /// Print the setup plan and write <platform>_config.json files
    Plan,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RedditArgs {
    /// Walk the newest listing or use Reddit search per keyword
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Comments to keep per post; 0 disables comment collection
    #[arg(long)]
    pub comments: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Listing,
    Search,
}

impl From<ModeArg> for RedditMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Listing => RedditMode::Listing,
            ModeArg::Search => RedditMode::Search,
        }
    }
}

impl Cli {
    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, cfg: &mut HarvestConfig) {
        if let Some(dir) = &self.output_dir {
            cfg.output.dir = dir.clone();
        }
        if let Some(dataset) = &self.dataset {
            cfg.output.dataset = dataset.clone();
        }
        if let Some(format) = self.log_format {
            cfg.logging.format = format;
        }
        if let (Command::Reddit(args), Some(reddit)) = (&self.command, cfg.reddit.as_mut()) {
            if let Some(mode) = args.mode {
                reddit.mode = mode.into();
            }
            if let Some(n) = args.comments {
                reddit.comments_per_post = n;
            }
        }
    }
}
