//! Channel history collection over any [`TelegramApi`].
use crate::context::RunContext;
use crate::error::CollectError;
use crate::filter::{AllowList, ItemFilter};
use crate::pagination::{PageLimits, PageSource, Paginator, collect_retained};
use crate::summary::PlatformRun;
use async_trait::async_trait;
use harvest_common::{Platform, TelegramMessage};
use harvest_config::TelegramConfig;
use harvest_social::telegram::{ChannelMessage, ResolvedChannel, TelegramApi, history_page, message_record};
use harvest_social::{Page, SocialError};

struct HistorySource<'a, A: ?Sized> {
    api: &'a mut A,
    channel: ResolvedChannel,
    page_size: u32,
}

#[async_trait]
impl<A> PageSource for HistorySource<'_, A>
where
    A: TelegramApi + ?Sized,
{
    type Item = ChannelMessage;

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<ChannelMessage>, SocialError> {
        history_page(&mut *self.api, &self.channel, cursor, self.page_size).await
    }
}

pub async fn collect_telegram<A>(
    api: &mut A,
    cfg: &TelegramConfig,
    ctx: &RunContext,
) -> Result<Vec<TelegramMessage>, CollectError>
where
    A: TelegramApi + ?Sized,
{
    let channels = ItemFilter::allow_only(AllowList::new(&cfg.channels));
    let page_size = u32::try_from(cfg.batch_size).unwrap_or(u32::MAX);
    let mut records: Vec<TelegramMessage> = Vec::new();

    for name in &cfg.channels {
        let remaining = cfg.max_total_messages.saturating_sub(records.len());
        if remaining == 0 {
            tracing::info!(target: "telegram", cap = cfg.max_total_messages, "telegram.total_cap_reached");
            break;
        }

        ctx.rate.acquire().await;
        let channel = api.resolve_channel(name).await?;
        // a username can be handed over to a different channel
        if channels.check(&channel.username, "").is_none() {
            tracing::warn!(
                target: "telegram",
                requested = %name,
                resolved = %channel.username,
                "telegram.channel.not_allowed"
            );
            continue;
        }
        let username = channel.username.clone();
        let source = HistorySource {
            api: &mut *api,
            channel,
            page_size,
        };
        let stream = Paginator::new(source, ctx.rate.clone())
            .limits(PageLimits {
                max_items: None,
                max_walked: cfg.messages_per_channel,
            })
            .window(Some(ctx.window))
            .label(name.as_str())
            .into_stream();

        let batch = collect_retained(stream, Some(remaining), |msg: ChannelMessage| {
            if msg.text.chars().count() < cfg.min_text_length {
                return None;
            }
            Some(message_record(&username, &msg))
        })
        .await?;
        tracing::info!(target: "telegram", channel = %name, messages = batch.len(), "telegram.channel.done");
        records.extend(batch);
    }
    Ok(ctx.dedupe(records))
}

pub async fn run_telegram(cfg: &TelegramConfig, ctx: &RunContext) -> Result<PlatformRun, CollectError> {
    let mut client = connect(cfg).await?;
    let records = collect_telegram(&mut client, cfg, ctx).await?;

    let files = ctx.write_output(&ctx.stem(Platform::Telegram), &records)?;
    Ok(PlatformRun::ok(Platform::Telegram, records.len(), files))
}

#[cfg(feature = "mtproto")]
async fn connect(
    cfg: &TelegramConfig,
) -> Result<harvest_social::telegram::mtproto::MtprotoClient, CollectError> {
    use harvest_config::resolved_secret;
    use harvest_social::telegram::mtproto::{LoginSettings, MtprotoClient};

    let missing = |what: &str| SocialError::missing_credential(Platform::Telegram, what);
    let api_id = resolved_secret(&cfg.api_id)
        .ok_or_else(|| missing("telegram.api_id (TELEGRAM_API_ID)"))?
        .parse::<i32>()
        .map_err(|_| missing("a numeric telegram.api_id"))?;
    let api_hash = resolved_secret(&cfg.api_hash).ok_or_else(|| missing("telegram.api_hash (TELEGRAM_API_HASH)"))?;
    let phone = resolved_secret(&cfg.phone).ok_or_else(|| missing("telegram.phone (TELEGRAM_PHONE)"))?;

    let settings = LoginSettings {
        api_id,
        api_hash: api_hash.to_string(),
        phone: phone.to_string(),
        session_file: cfg.session_file.clone(),
    };
    Ok(MtprotoClient::connect(&settings).await?)
}

#[cfg(not(feature = "mtproto"))]
async fn connect(_cfg: &TelegramConfig) -> Result<Unavailable, CollectError> {
    Err(CollectError::Setup(
        "telegram support is not compiled in; rebuild with `--features mtproto`".into(),
    ))
}

/// Stand-in client type for builds without MTProto support.
#[cfg(not(feature = "mtproto"))]
enum Unavailable {}

#[cfg(not(feature = "mtproto"))]
#[async_trait]
impl TelegramApi for Unavailable {
    async fn resolve_channel(&mut self, _username: &str) -> Result<ResolvedChannel, SocialError> {
        match *self {}
    }

    async fn history(
        &mut self,
        _channel: &ResolvedChannel,
        _before_id: Option<i64>,
        _limit: u32,
    ) -> Result<Vec<ChannelMessage>, SocialError> {
        match *self {}
    }
}
