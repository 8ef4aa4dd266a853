use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Wait time the remote service asked for, if it sent one.
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        match self {
            CoreError::RedditApi(e) => {
                e.log_error();
            }
            CoreError::Telegram(e) => {
                e.log_error();
            }
            CoreError::Config(e) => {
                e.log_error();
            }
            _ => error!("CoreError: {}", self),
        }
        self
    }

    fn log_warn(&self) -> &Self {
        match self {
            CoreError::RedditApi(e) => {
                e.log_warn();
            }
            CoreError::Telegram(e) => {
                e.log_warn();
            }
            CoreError::Config(e) => {
                e.log_warn();
            }
            _ => warn!("CoreError (warning): {}", self),
        }
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            CoreError::Telegram(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Telegram(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Io(_) => {
                "Could not read or write a local file. Please check permissions.".to_string()
            }
            CoreError::Serialization(_) => {
                "Stored data could not be decoded. The file may be corrupt.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::Internal { .. } => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.error_code(),
            CoreError::Telegram(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("RedditApiError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. The subreddit may be private or quarantined.",
                resource
            ),
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit '{}' not found or is private.", subreddit)
            }
            RedditApiError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
            RedditApiError::UnexpectedStatus { .. } => "REDDIT_UNEXPECTED_STATUS".to_string(),
        }
    }
}

impl ErrorExt for TelegramError {
    fn log_error(&self) -> &Self {
        error!("TelegramError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("TelegramError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            TelegramError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            TelegramError::Unauthorized => {
                "Telegram rejected the bot token. Please check bot_token.".to_string()
            }
            TelegramError::ChatNotFound { chat_id } => format!(
                "Chat {} not found. Make sure the bot has been added to the group.",
                chat_id
            ),
            TelegramError::RateLimitExceeded { retry_after } => format!(
                "Telegram is throttling the bot. Please wait {} seconds.",
                retry_after
            ),
            TelegramError::RequestTimeout { .. } => {
                "Request to Telegram timed out. Please try again.".to_string()
            }
            _ => "Telegram API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            TelegramError::Unauthorized => "TELEGRAM_UNAUTHORIZED".to_string(),
            TelegramError::ChatNotFound { .. } => "TELEGRAM_CHAT_NOT_FOUND".to_string(),
            TelegramError::RateLimitExceeded { .. } => "TELEGRAM_RATE_LIMIT".to_string(),
            TelegramError::Api { .. } => "TELEGRAM_API".to_string(),
            TelegramError::RequestTimeout { .. } => "TELEGRAM_TIMEOUT".to_string(),
            TelegramError::InvalidResponse { .. } => "TELEGRAM_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => format!(
                "Configuration file '{}' not found. Please create it or pass --config.",
                path
            ),
            ConfigError::InvalidFormat { .. } | ConfigError::Parse(_) => {
                "Configuration file is malformed. Please check its syntax.".to_string()
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs failed operations with their error code and user-facing message.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    /// For failures that end an operation.
    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        if let Some(wait) = error.retry_after() {
            info!("Remote service asked to wait {:?} before the next request", wait);
        }
    }

    /// For failures the operation survives.
    pub fn report_warning(&self, error: &CoreError) {
        error.log_warn();
        info!("Error code: {}", error.error_code());
    }
}
