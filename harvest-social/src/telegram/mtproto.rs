//! [`TelegramApi`] over a grammers MTProto session.
//!
//! The first run asks for the login code (and the 2FA password when the
//! account has one) on stdin, then persists the session file so later runs
//! start authorized.
use super::{ChannelMessage, ResolvedChannel, TelegramApi};
use crate::SocialError;
use async_trait::async_trait;
use grammers_client::types::PackedChat;
use grammers_client::{Client, Config, InitParams, InvocationError, SignInError};
use grammers_session::Session;
use harvest_common::Platform;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
    pub session_file: PathBuf,
}

pub struct MtprotoClient {
    client: Client,
    session_file: PathBuf,
    chats: HashMap<String, PackedChat>,
}

impl MtprotoClient {
    /// Connect and, if the stored session is not authorized yet, log in
    /// interactively.
    pub async fn connect(settings: &LoginSettings) -> Result<Self, SocialError> {
        let session = Session::load_file_or_create(&settings.session_file)
            .map_err(|e| SocialError::Telegram(format!("session file: {e}")))?;
        let client = Client::connect(Config {
            session,
            api_id: settings.api_id,
            api_hash: settings.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| SocialError::Telegram(format!("connect: {e}")))?;

        let authorized = client.is_authorized().await.map_err(classify)?;
        let this = Self {
            client,
            session_file: settings.session_file.clone(),
            chats: HashMap::new(),
        };
        if !authorized {
            tracing::info!(target: "telegram", phone = %mask_phone(&settings.phone), "telegram.login");
            this.sign_in(&settings.phone).await?;
        }
        this.save_session()?;
        Ok(this)
    }

    async fn sign_in(&self, phone: &str) -> Result<(), SocialError> {
        let token = self
            .client
            .request_login_code(phone)
            .await
            .map_err(|e| auth_error(format!("requesting login code: {e}")))?;
        let code = prompt("Enter the code Telegram sent you: ").await?;

        match self.client.sign_in(&token, code.trim()).await {
            Ok(_) => Ok(()),
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().unwrap_or("none").to_string();
                let password = prompt(&format!("Two-step verification password (hint: {hint}): ")).await?;
                self.client
                    .check_password(password_token, password.trim())
                    .await
                    .map(|_| ())
                    .map_err(|e| auth_error(format!("password rejected: {e}")))
            }
            Err(e) => Err(auth_error(format!("sign in failed: {e}"))),
        }
    }

    fn save_session(&self) -> Result<(), SocialError> {
        self.client
            .session()
            .save_to_file(&self.session_file)
            .map_err(|e| SocialError::Telegram(format!("saving session: {e}")))
    }
}

#[async_trait]
impl TelegramApi for MtprotoClient {
    async fn resolve_channel(&mut self, username: &str) -> Result<ResolvedChannel, SocialError> {
        let chat = self
            .client
            .resolve_username(username)
            .await
            .map_err(classify)?
            .ok_or_else(|| SocialError::NotFound {
                platform: Platform::Telegram,
                what: format!("channel @{username}"),
            })?;
        // the server's answer, which differs if the name changed hands
        let actual = chat.username().unwrap_or(username).to_string();
        self.chats.insert(actual.clone(), chat.pack());
        Ok(ResolvedChannel {
            username: actual,
            handle: chat.id().to_string(),
        })
    }

    async fn history(
        &mut self,
        channel: &ResolvedChannel,
        before_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChannelMessage>, SocialError> {
        let packed = *self
            .chats
            .get(&channel.username)
            .ok_or_else(|| SocialError::Telegram(format!("@{} was not resolved", channel.username)))?;

        let mut iter = self.client.iter_messages(packed).limit(limit as usize);
        if let Some(before) = before_id {
            let offset = i32::try_from(before)
                .map_err(|_| SocialError::Telegram(format!("message id {before} out of range")))?;
            iter = iter.offset_id(offset);
        }

        let mut out = Vec::with_capacity(limit as usize);
        while let Some(msg) = iter.next().await.map_err(classify)? {
            out.push(ChannelMessage {
                id: i64::from(msg.id()),
                date: msg.date(),
                text: msg.text().to_string(),
                views: msg.view_count().map(i64::from),
                forwards: msg.forward_count().map(i64::from),
                replies: msg.reply_count().map(i64::from),
                has_media: msg.media().is_some(),
            });
        }
        Ok(out)
    }
}

fn classify(err: InvocationError) -> SocialError {
    match &err {
        InvocationError::Rpc(rpc) if rpc.name.starts_with("FLOOD_WAIT") => SocialError::Quota {
            platform: Platform::Telegram,
            message: format!("flood wait of {}s", rpc.value.unwrap_or(0)),
        },
        InvocationError::Rpc(rpc) if rpc.code == 401 => auth_error(rpc.name.clone()),
        InvocationError::Rpc(rpc)
            if matches!(rpc.name.as_str(), "USERNAME_INVALID" | "USERNAME_NOT_OCCUPIED" | "CHANNEL_PRIVATE") =>
        {
            SocialError::NotFound {
                platform: Platform::Telegram,
                what: rpc.name.clone(),
            }
        }
        _ => SocialError::Telegram(err.to_string()),
    }
}

fn auth_error(message: String) -> SocialError {
    SocialError::Auth {
        platform: Platform::Telegram,
        message,
    }
}

async fn prompt(question: &str) -> Result<String, SocialError> {
    let stdout_err = |e: std::io::Error| SocialError::Telegram(format!("stdout: {e}"));
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await.map_err(stdout_err)?;
    stdout.flush().await.map_err(stdout_err)?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| SocialError::Telegram(format!("stdin: {e}")))?;
    Ok(line)
}

fn mask_phone(phone: &str) -> String {
    let keep = phone.len().saturating_sub(4);
    phone
        .char_indices()
        .map(|(i, c)| if i < keep && c.is_ascii_digit() { '*' } else { c })
        .collect()
}
