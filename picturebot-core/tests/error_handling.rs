use picturebot_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, RedditApiError, TelegramError,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(reddit_error.error_code(), "REDDIT_TIMEOUT");

    let telegram_error = CoreError::Telegram(TelegramError::Unauthorized);
    assert_eq!(telegram_error.error_code(), "TELEGRAM_UNAUTHORIZED");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "bot_token".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG_MISSING_FIELD");

    let invalid = CoreError::InvalidInput {
        message: "empty subreddit".to_string(),
    };
    assert_eq!(invalid.error_code(), "INVALID_INPUT");
}

#[test]
fn test_retry_after_only_from_server_hint() {
    let rate_limit_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let telegram_limit = CoreError::Telegram(TelegramError::RateLimitExceeded { retry_after: 3 });
    assert_eq!(telegram_limit.retry_after(), Some(Duration::from_secs(3)));

    let timeout = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(timeout.retry_after(), None);

    let server_error = CoreError::Telegram(TelegramError::Api {
        code: 502,
        description: "Bad Gateway".to_string(),
    });
    assert_eq!(server_error.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::SubredditNotFound {
        subreddit: "doesnotexist".to_string(),
    });
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("doesnotexist"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "bot_token".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("bot_token"));

    let telegram_error = CoreError::Telegram(TelegramError::ChatNotFound { chat_id: -42 });
    assert!(telegram_error.user_friendly_message().contains("-42"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new();
    let error = CoreError::Telegram(TelegramError::RateLimitExceeded { retry_after: 5 });

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&CoreError::Io(std::io::Error::other("disk full")));
}
