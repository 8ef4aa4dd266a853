//! Minimal Telegram Bot API client for posting pictures and videos to a chat.

use picturebot_core::{
    CandidatePost, ConfigError, CoreError, MediaKind, Messenger, TelegramError, TelegramSettings,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn new(token: String) -> Self {
        Self {
            token,
            base_url: TELEGRAM_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(token: String, settings: &TelegramSettings) -> Self {
        Self {
            token,
            base_url: settings.base_url.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SendPhotoRequest<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
}

#[derive(Debug, Serialize)]
struct SendVideoRequest<'a> {
    chat_id: i64,
    video: &'a str,
    caption: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Sent message as returned by the Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
    #[serde(default)]
    pub date: i64,
}

pub struct TelegramBot {
    http_client: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramBot {
    pub fn new(config: TelegramConfig) -> Result<Self, CoreError> {
        if config.token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bot_token".to_string(),
            }
            .into());
        }

        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ConfigError::InvalidValue {
            field: "telegram.base_url".to_string(),
            value: format!("{} ({})", config.base_url, e),
        })?;

        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            token: config.token,
        })
    }

    async fn call<B: Serialize>(
        &self,
        api_method: &str,
        chat_id: i64,
        body: &B,
    ) -> Result<SentMessage, CoreError> {
        // The "./" keeps the token's colon from being read as a URL scheme.
        let url = self
            .base_url
            .join(&format!("./bot{}/{}", self.token, api_method))
            .map_err(|e| CoreError::Internal {
                message: format!("Could not build URL for {}: {}", api_method, e),
            })?;

        info!("Calling Telegram {} for chat {}", api_method, chat_id);
        let response = match self.http_client.post(url).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                // reqwest errors carry the URL, which contains the token.
                let e = e.without_url();
                error!("Network error for {}: {}", api_method, e);
                if e.is_timeout() {
                    return Err(TelegramError::RequestTimeout {
                        method: api_method.to_string(),
                    }
                    .into());
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        let api_response: ApiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse {} response ({}): {}", api_method, status, e.without_url());
            TelegramError::InvalidResponse {
                method: api_method.to_string(),
                details: format!("undecodable body with status {}", status),
            }
        })?;

        if !api_response.ok {
            let err = Self::map_api_error(chat_id, status.as_u16(), api_response);
            error!("Telegram {} failed: {}", api_method, err);
            return Err(err.into());
        }

        let result = api_response.result.unwrap_or(Value::Null);
        let sent: SentMessage =
            serde_json::from_value(result).map_err(|e| TelegramError::InvalidResponse {
                method: api_method.to_string(),
                details: e.to_string(),
            })?;
        debug!("Telegram {} delivered message {}", api_method, sent.message_id);
        Ok(sent)
    }

    fn map_api_error(chat_id: i64, status: u16, response: ApiResponse) -> TelegramError {
        let code = response.error_code.unwrap_or(status);
        let description = response.description.unwrap_or_default();

        match code {
            401 => TelegramError::Unauthorized,
            429 => {
                let retry_after = response
                    .parameters
                    .and_then(|p| p.retry_after)
                    .unwrap_or(30);
                warn!("Telegram rate limit, retry after {} seconds", retry_after);
                TelegramError::RateLimitExceeded { retry_after }
            }
            400 if description.to_lowercase().contains("chat not found") => {
                TelegramError::ChatNotFound { chat_id }
            }
            _ => TelegramError::Api { code, description },
        }
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, CoreError> {
        self.call("sendMessage", chat_id, &SendMessageRequest { chat_id, text })
            .await
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<SentMessage, CoreError> {
        let body = SendPhotoRequest {
            chat_id,
            photo: photo_url,
            caption,
        };
        self.call("sendPhoto", chat_id, &body).await
    }

    pub async fn send_video(
        &self,
        chat_id: i64,
        video_url: &str,
        caption: &str,
    ) -> Result<SentMessage, CoreError> {
        let body = SendVideoRequest {
            chat_id,
            video: video_url,
            caption,
        };
        self.call("sendVideo", chat_id, &body).await
    }
}

impl Messenger for TelegramBot {
    async fn send_post(&self, chat_id: i64, post: &CandidatePost) -> Result<(), CoreError> {
        let caption = post.caption();
        match post.media_kind {
            MediaKind::Photo => self.send_photo(chat_id, &post.media_url, &caption).await?,
            MediaKind::Video => self.send_video(chat_id, &post.media_url, &caption).await?,
        };
        Ok(())
    }
}
