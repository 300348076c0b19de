//! Loader for collector configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (the values the original collection runs used),
//! 2. `harvest.yaml` (or any file passed to [`HarvestConfigLoader::with_file`]),
//! 3. inline YAML snippets,
//! 4. `HARVEST__SECTION__KEY` environment variables.
//!
//! String values may reference the environment as `${VAR}` (typically
//! credentials kept in `.env`); expansion happens after merging, before the
//! typed structs are built.
use chrono::NaiveDate;
use config::{Config, Environment, File};
use harvest_common::observability::LogFormat;
use harvest_common::{DateWindow, InvalidWindow, Platform};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "HARVEST";

pub const DEFAULT_CONFIG_FILE: &str = "harvest.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<InvalidWindow> for ConfigError {
    fn from(e: InvalidWindow) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub date_range: DateRangeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reddit: Option<RedditConfig>,
    #[serde(default)]
    pub youtube: Option<YoutubeConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub twitter: Option<TwitterConfig>,
}

impl HarvestConfig {
    /// Reject settings no collector could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.date_range.window()?;
        if self.output.dataset.trim().is_empty() {
            return Err(ConfigError::Invalid("output.dataset must not be empty".into()));
        }
        if let Some(reddit) = &self.reddit {
            if reddit.subreddits.is_empty() {
                return Err(ConfigError::Invalid("reddit.subreddits is empty".into()));
            }
        }
        if let Some(youtube) = &self.youtube {
            if youtube.channels.is_empty() {
                return Err(ConfigError::Invalid("youtube.channels is empty".into()));
            }
        }
        if let Some(telegram) = &self.telegram {
            if telegram.channels.is_empty() {
                return Err(ConfigError::Invalid("telegram.channels is empty".into()));
            }
        }
        Ok(())
    }

    /// Platforms that have a configuration section, in a stable order.
    pub fn configured_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| match p {
                Platform::Reddit => self.reddit.is_some(),
                Platform::Youtube => self.youtube.is_some(),
                Platform::Telegram => self.telegram.is_some(),
                Platform::Twitter => self.twitter.is_some(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Suffix of every output file: `<platform>_<dataset>.json`.
    #[serde(default = "default_dataset")]
    pub dataset: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            dataset: default_dataset(),
        }
    }
}

impl OutputConfig {
    pub fn stem(&self, platform: Platform) -> String {
        format!("{}_{}", platform.as_str(), self.dataset)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Pause between successive requests to one platform.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for 429/5xx responses. Zero keeps the abort-on-error behaviour.
    #[serde(default)]
    pub retries: usize,
    /// Drop repeated identifiers within one run.
    #[serde(default)]
    pub dedupe: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
            dedupe: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeConfig {
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
}

impl Default for DateRangeConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: default_end_date(),
        }
    }
}

impl DateRangeConfig {
    pub fn window(&self) -> Result<DateWindow, InvalidWindow> {
        DateWindow::from_dates(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_true")]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            dir: None,
            filter: default_log_filter(),
            stderr: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditMode {
    /// Walk `/r/{sub}/new` and keep posts mentioning a keyword.
    #[default]
    Listing,
    /// Run Reddit's own search once per keyword inside each subreddit.
    Search,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_base")]
    pub base_url: String,
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub mode: RedditMode,
    #[serde(default = "default_posts_per_subreddit")]
    pub posts_per_subreddit: usize,
    #[serde(default = "default_max_total_posts")]
    pub max_total_posts: usize,
    /// Zero disables comment collection.
    #[serde(default)]
    pub comments_per_post: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelRef {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default = "default_youtube_base")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub channels: Vec<ChannelRef>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_max_videos")]
    pub max_videos_per_channel: usize,
    #[serde(default = "default_max_comments")]
    pub max_comments_per_video: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, deserialize_with = "string_or_number")]
    pub api_id: String,
    #[serde(default)]
    pub api_hash: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone: String,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    pub channels: Vec<String>,
    /// `None` walks each channel back to the start of the date range.
    #[serde(default = "default_messages_per_channel")]
    pub messages_per_channel: Option<usize>,
    #[serde(default = "default_max_total_messages")]
    pub max_total_messages: usize,
    #[serde(default)]
    pub min_text_length: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_twitter_base")]
    pub base_url: String,
    #[serde(default)]
    pub bearer_token: String,
    pub keywords: Vec<String>,
    /// Appended to each query as `lang:<code>`.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_tweets_per_keyword")]
    pub tweets_per_keyword: usize,
    #[serde(default = "default_max_total_tweets")]
    pub max_total_tweets: usize,
}

/// A credential is usable when it is non-empty, fully expanded and not one of
/// the `YOUR_...` template placeholders.
///
/// ```
/// use harvest_config::resolved_secret;
///
/// assert_eq!(resolved_secret(" abc "), Some("abc"));
/// assert_eq!(resolved_secret("${YOUTUBE_API_KEY}"), None);
/// assert_eq!(resolved_secret("YOUR_API_KEY"), None);
/// assert_eq!(resolved_secret(""), None);
/// ```
pub fn resolved_secret(raw: &str) -> Option<&str> {
    let s = raw.trim();
    if s.is_empty() || s.contains("${") || s.starts_with("YOUR_") {
        None
    } else {
        Some(s)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("collected_data")
}
fn default_dataset() -> String {
    "israel_palestine".into()
}
fn default_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 10, 7).unwrap_or_default()
}
fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap_or_default()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}
fn default_reddit_base() -> String {
    "https://www.reddit.com".into()
}
fn default_reddit_user_agent() -> String {
    concat!("harvest/", env!("CARGO_PKG_VERSION"), " (research collector)").into()
}
fn default_posts_per_subreddit() -> usize {
    5000
}
fn default_max_total_posts() -> usize {
    20000
}
fn default_youtube_base() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}
fn default_max_videos() -> usize {
    10
}
fn default_max_comments() -> usize {
    500
}
fn default_session_file() -> PathBuf {
    PathBuf::from("telegram_session")
}
fn default_messages_per_channel() -> Option<usize> {
    Some(3000)
}
fn default_max_total_messages() -> usize {
    150_000
}
fn default_batch_size() -> usize {
    100
}
fn default_twitter_base() -> String {
    "https://api.twitter.com".into()
}
fn default_tweets_per_keyword() -> usize {
    2000
}
fn default_max_total_tweets() -> usize {
    10_000
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct HarvestConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
}

impl Default for HarvestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str("output:\n  dataset: smoke")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.output.dataset, "smoke");
    /// assert_eq!(config.collection.delay_ms, 1000);
    /// assert!(config.reddit.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that may be missing, so env-only runs still work.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    ///
    /// ```
    /// use harvest_config::{HarvestConfigLoader, RedditMode};
    ///
    /// let cfg = HarvestConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// reddit:
    ///   subreddits: ["worldnews"]
    ///   keywords: ["Israel"]
    ///   mode: search
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let reddit = cfg.reddit.unwrap();
    /// assert_eq!(reddit.mode, RedditMode::Search);
    /// assert_eq!(reddit.posts_per_subreddit, 5000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Consume the builder and deserialize the merged sources into typed config.
    ///
    /// ```
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_YT_KEY", "injected-from-env"); }
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// youtube:
    ///   api_key: "${DOC_YT_KEY}"
    ///   channels:
    ///     - name: BBC
    ///       id: UC16niRr50-MSBwiO3YDb3RA
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// let yt = config.youtube.unwrap();
    /// assert_eq!(yt.api_key, "injected-from-env");
    /// assert_eq!(yt.channels[0].name, "BBC");
    /// assert_eq!(yt.max_comments_per_video, 500);
    ///
    /// unsafe { std::env::remove_var("DOC_YT_KEY"); }
    /// ```
    pub fn load(self) -> Result<HarvestConfig, ConfigError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: HarvestConfig = serde_json::from_value(v)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        typed.validate()?;
        Ok(typed)
    }
}
