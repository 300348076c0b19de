use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use harvest_common::Platform;
use harvest_config::{HarvestConfigLoader, TelegramConfig};
use harvest_pipeline::telegram::collect_telegram;
use harvest_pipeline::{CollectError, RunContext};
use harvest_social::SocialError;
use harvest_social::telegram::{ChannelMessage, ResolvedChannel, TelegramApi};
use std::collections::HashMap;

/// In-memory channels, newest message first.
#[derive(Default)]
struct FakeTelegram {
    channels: HashMap<String, Vec<ChannelMessage>>,
    /// Requested username -> the username the server answers with.
    renamed: HashMap<String, String>,
    history_calls: usize,
}

impl FakeTelegram {
    fn with_channel(mut self, name: &str, texts: &[&str]) -> Self {
        let newest = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let count = texts.len() as i64;
        let messages = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ChannelMessage {
                id: count - i as i64,
                date: newest - Duration::hours(i as i64),
                text: text.to_string(),
                views: Some(100),
                forwards: None,
                replies: None,
                has_media: false,
            })
            .collect();
        self.channels.insert(name.to_string(), messages);
        self
    }

    fn renamed(mut self, requested: &str, actual: &str) -> Self {
        self.renamed.insert(requested.to_string(), actual.to_string());
        self
    }
}

#[async_trait]
impl TelegramApi for FakeTelegram {
    async fn resolve_channel(&mut self, username: &str) -> Result<ResolvedChannel, SocialError> {
        if !self.channels.contains_key(username) {
            return Err(SocialError::NotFound {
                platform: Platform::Telegram,
                what: username.to_string(),
            });
        }
        let actual = self.renamed.get(username).map_or(username, String::as_str);
        Ok(ResolvedChannel {
            username: actual.to_string(),
            handle: username.to_string(),
        })
    }

    async fn history(
        &mut self,
        channel: &ResolvedChannel,
        before_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChannelMessage>, SocialError> {
        self.history_calls += 1;
        let messages = self.channels.get(&channel.handle).cloned().unwrap_or_default();
        Ok(messages
            .into_iter()
            .filter(|m| before_id.is_none_or(|b| m.id < b))
            .take(limit as usize)
            .collect())
    }
}

fn setup(extra: &str) -> (TelegramConfig, RunContext) {
    setup_in_range("", extra)
}

fn setup_in_range(date_range: &str, extra: &str) -> (TelegramConfig, RunContext) {
    let cfg = HarvestConfigLoader::new()
        .with_yaml_str(&format!(
            "{date_range}collection:\n  delay_ms: 0\ntelegram:\n  channels: [GazaNow, QudsN]\n  batch_size: 2\n{extra}"
        ))
        .load()
        .unwrap();
    let ctx = RunContext::from_config(&cfg).unwrap();
    (cfg.telegram.unwrap(), ctx)
}

#[tokio::test]
async fn pages_through_every_channel() {
    let (cfg, ctx) = setup("");
    let mut api = FakeTelegram::default()
        .with_channel("GazaNow", &["one", "two", "three", "four", "five"])
        .with_channel("QudsN", &["alpha"]);

    let records = collect_telegram(&mut api, &cfg, &ctx).await.unwrap();

    assert_eq!(records.len(), 6);
    assert_eq!(records[0].channel, "GazaNow");
    assert_eq!(records[0].message_id, 5);
    assert_eq!(records[0].link, "https://t.me/GazaNow/5");
    assert_eq!(records[0].replies, 0);
    assert_eq!(records[5].channel, "QudsN");
    // 5 messages in pages of 2 take three calls, the single QudsN message one.
    assert_eq!(api.history_calls, 4);
}

#[tokio::test]
async fn short_messages_are_dropped() {
    let (cfg, ctx) = setup("  min_text_length: 4\n");
    let mut api = FakeTelegram::default()
        .with_channel("GazaNow", &["ok", "long enough", "مرحبا"])
        .with_channel("QudsN", &[]);

    let records = collect_telegram(&mut api, &cfg, &ctx).await.unwrap();

    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["long enough", "مرحبا"]);
}

#[tokio::test]
async fn per_channel_and_total_caps_apply() {
    let (cfg, ctx) = setup("  messages_per_channel: 2\n  max_total_messages: 3\n");
    let mut api = FakeTelegram::default()
        .with_channel("GazaNow", &["a1", "a2", "a3", "a4"])
        .with_channel("QudsN", &["b1", "b2", "b3"]);

    let records = collect_telegram(&mut api, &cfg, &ctx).await.unwrap();

    let ids: Vec<(String, i64)> = records.iter().map(|r| (r.channel.clone(), r.message_id)).collect();
    assert_eq!(
        ids,
        vec![
            ("GazaNow".to_string(), 4),
            ("GazaNow".to_string(), 3),
            ("QudsN".to_string(), 3)
        ]
    );
}

#[tokio::test]
async fn unknown_channel_fails_the_run() {
    let (cfg, ctx) = setup("");
    let mut api = FakeTelegram::default().with_channel("GazaNow", &["x"]);

    let err = collect_telegram(&mut api, &cfg, &ctx).await.unwrap_err();
    assert!(matches!(
        err,
        CollectError::Social(SocialError::NotFound { ref what, .. }) if what == "QudsN"
    ));
}

#[tokio::test]
async fn walk_cap_bounds_history_newer_than_the_window() {
    let (cfg, ctx) = setup_in_range(
        "date_range:\n  start_date: \"2024-01-01\"\n  end_date: \"2024-06-01\"\n",
        "  messages_per_channel: 4\n",
    );
    let texts: Vec<String> = (0..10).map(|i| format!("msg {i}")).collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    let mut api = FakeTelegram::default()
        .with_channel("GazaNow", &texts)
        .with_channel("QudsN", &[]);

    let records = collect_telegram(&mut api, &cfg, &ctx).await.unwrap();

    assert!(records.is_empty());
    // four walked messages fit in two pages of two; QudsN takes one call
    assert_eq!(api.history_calls, 3);
}

#[tokio::test]
async fn channel_resolving_outside_the_list_is_skipped() {
    let (cfg, ctx) = setup("");
    let mut api = FakeTelegram::default()
        .with_channel("GazaNow", &["handed over"])
        .with_channel("QudsN", &["kept"])
        .renamed("GazaNow", "SpamChannel");

    let records = collect_telegram(&mut api, &cfg, &ctx).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, "QudsN");
    assert_eq!(api.history_calls, 1);
}
