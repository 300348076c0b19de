//! Dry-run setup plan: what each configured platform would collect, which
//! credentials are still missing, and the fields every output will carry.
use crate::error::CollectError;
use crate::writer::write_json_file;
use crate::youtube::estimated_quota;
use chrono::NaiveDate;
use harvest_common::{
    Platform, Record, RedditPost, TelegramMessage, TweetRecord, YoutubeComment,
};
use harvest_config::{HarvestConfig, RedditMode, resolved_secret};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformPlan {
    pub platform: Platform,
    pub sources: Vec<String>,
    pub keywords: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub limits: Map<String, Value>,
    pub fields_to_collect: &'static [&'static str],
    pub credentials_ready: bool,
    pub required_setup: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_quota: Option<u64>,
}

impl PlatformPlan {
    fn new(cfg: &HarvestConfig, platform: Platform, fields: &'static [&'static str]) -> Self {
        Self {
            platform,
            sources: Vec::new(),
            keywords: Vec::new(),
            start_date: cfg.date_range.start_date,
            end_date: cfg.date_range.end_date,
            limits: Map::new(),
            fields_to_collect: fields,
            credentials_ready: true,
            required_setup: Vec::new(),
            estimated_quota: None,
        }
    }

    fn limit(mut self, name: &str, value: Value) -> Self {
        self.limits.insert(name.to_string(), value);
        self
    }

    fn needs(mut self, ready: bool, step: &str) -> Self {
        if !ready {
            self.credentials_ready = false;
            self.required_setup.push(step.to_string());
        }
        self
    }

    /// `<dir>/<platform>_config.json`
    pub fn write(&self, dir: &Path) -> Result<PathBuf, CollectError> {
        let path = dir.join(format!("{}_config.json", self.platform.as_str()));
        write_json_file(&path, self)?;
        Ok(path)
    }
}

/// One plan per configured platform, in [`Platform::ALL`] order.
pub fn build_plan(cfg: &HarvestConfig) -> Vec<PlatformPlan> {
    let mut plans = Vec::new();

    if let Some(reddit) = &cfg.reddit {
        let mut plan = PlatformPlan::new(cfg, Platform::Reddit, RedditPost::FIELDS)
            .limit("mode", json!(match reddit.mode {
                RedditMode::Listing => "listing",
                RedditMode::Search => "search",
            }))
            .limit("posts_per_subreddit", json!(reddit.posts_per_subreddit))
            .limit("max_total_posts", json!(reddit.max_total_posts))
            .limit("comments_per_post", json!(reddit.comments_per_post));
        plan.sources = reddit.subreddits.iter().map(|s| format!("r/{s}")).collect();
        plan.keywords = reddit.keywords.clone();
        plans.push(plan);
    }

    if let Some(youtube) = &cfg.youtube {
        let mut plan = PlatformPlan::new(cfg, Platform::Youtube, YoutubeComment::FIELDS)
            .limit("max_videos_per_channel", json!(youtube.max_videos_per_channel))
            .limit("max_comments_per_video", json!(youtube.max_comments_per_video))
            .needs(
                resolved_secret(&youtube.api_key).is_some(),
                "Create an API key at https://console.cloud.google.com/apis/credentials and set YOUTUBE_API_KEY",
            );
        plan.sources = youtube
            .channels
            .iter()
            .map(|c| format!("{} ({})", c.name, c.id))
            .collect();
        plan.keywords = youtube.keywords.clone();
        plan.estimated_quota = Some(estimated_quota(youtube));
        plans.push(plan);
    }

    if let Some(telegram) = &cfg.telegram {
        let credentials = [&telegram.api_id, &telegram.api_hash, &telegram.phone]
            .iter()
            .all(|v| resolved_secret(v).is_some());
        let mut plan = PlatformPlan::new(cfg, Platform::Telegram, TelegramMessage::FIELDS)
            .limit("messages_per_channel", json!(telegram.messages_per_channel))
            .limit("max_total_messages", json!(telegram.max_total_messages))
            .limit("min_text_length", json!(telegram.min_text_length))
            .needs(
                credentials,
                "Register an application at https://my.telegram.org and set TELEGRAM_API_ID, TELEGRAM_API_HASH and TELEGRAM_PHONE",
            )
            .needs(
                cfg!(feature = "mtproto"),
                "Rebuild with `--features mtproto` to enable the Telegram client",
            );
        plan.sources = telegram.channels.iter().map(|c| format!("@{c}")).collect();
        plans.push(plan);
    }

    if let Some(twitter) = &cfg.twitter {
        let mut plan = PlatformPlan::new(cfg, Platform::Twitter, TweetRecord::FIELDS)
            .limit("tweets_per_keyword", json!(twitter.tweets_per_keyword))
            .limit("max_total_tweets", json!(twitter.max_total_tweets))
            .limit("language", json!(twitter.language))
            .needs(
                resolved_secret(&twitter.bearer_token).is_some(),
                "Create a project at https://developer.x.com and set TWITTER_BEARER_TOKEN",
            );
        plan.keywords = twitter.keywords.clone();
        plans.push(plan);
    }
    plans
}

/// Write every plan into `dir`; returns the files written.
pub fn write_plan(plans: &[PlatformPlan], dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
    plans.iter().map(|p| p.write(dir)).collect()
}

/// Human readable rendering for the terminal.
pub fn render_plan(plans: &[PlatformPlan]) -> String {
    let mut out = String::new();
    if plans.is_empty() {
        out.push_str("No platform is configured. Add a reddit, youtube, telegram or twitter section to harvest.yaml.\n");
        return out;
    }
    for plan in plans {
        let _ = writeln!(out, "== {} ==", plan.platform.display_name());
        let _ = writeln!(out, "Date range: {} to {}", plan.start_date, plan.end_date);
        if !plan.sources.is_empty() {
            let _ = writeln!(out, "Sources:");
            for (i, s) in plan.sources.iter().enumerate() {
                let _ = writeln!(out, "  {}. {s}", i + 1);
            }
        }
        if !plan.keywords.is_empty() {
            let _ = writeln!(out, "Keywords: {}", plan.keywords.join(", "));
        }
        for (name, value) in &plan.limits {
            let _ = writeln!(out, "{name}: {value}");
        }
        if let Some(units) = plan.estimated_quota {
            let _ = writeln!(out, "Estimated quota: {units} units");
        }
        let _ = writeln!(out, "Fields: {}", plan.fields_to_collect.join(", "));
        if plan.credentials_ready {
            let _ = writeln!(out, "Ready to collect.");
        } else {
            let _ = writeln!(out, "Required setup:");
            for (i, step) in plan.required_setup.iter().enumerate() {
                let _ = writeln!(out, "  {}. {step}", i + 1);
            }
        }
        out.push('\n');
    }
    out
}
