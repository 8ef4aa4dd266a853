//! Runtime configuration.
//!
//! The configuration is read once at startup from a TOML file (or JSON when
//! the path ends in `.json`), validated, and then shared read-only.

use crate::history::DEFAULT_MAX_HISTORY_SIZE;
use crate::selector::{SelectionPolicy, TitleFilter};
use crate::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const BOT_TOKEN_ENV: &str = "PICTUREBOT_BOT_TOKEN";

/// A configured subreddit, either as a bare name or with a selection weight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SubredditSpec {
    Name(String),
    Weighted {
        name: String,
        #[serde(default = "default_weight")]
        weight: u32,
    },
}

impl SubredditSpec {
    pub fn name(&self) -> &str {
        match self {
            SubredditSpec::Name(name) => name,
            SubredditSpec::Weighted { name, .. } => name,
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            SubredditSpec::Name(_) => 1,
            SubredditSpec::Weighted { weight, .. } => *weight,
        }
    }
}

/// Weekday/hour/minute pattern on which a dispatch cycle runs.
///
/// Days count from Monday = 0.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Trigger {
    pub days: Vec<u32>,
    pub hours: Vec<u32>,
    pub minutes: Vec<u32>,
    #[serde(default)]
    pub subreddit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            user_agent: concat!("picturebot/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.telegram.org".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub test_group_id: Option<i64>,
    #[serde(default)]
    pub subreddits: Vec<SubredditSpec>,
    /// Title patterns keyed by subreddit; posts whose title does not match are skipped.
    #[serde(default)]
    pub filter_regex: HashMap<String, String>,
    #[serde(default = "default_max_history_size")]
    pub max_history_size: usize,
    /// How many of the newest posts are inspected per fetch.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u32,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
    #[serde(default)]
    pub reddit: RedditSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
}

fn default_weight() -> u32 {
    1
}

fn default_max_history_size() -> usize {
    DEFAULT_MAX_HISTORY_SIZE
}

fn default_max_candidates() -> u32 {
    10
}

fn default_history_file() -> PathBuf {
    PathBuf::from("posts.json")
}

fn default_tick_interval_seconds() -> u64 {
    15
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            ErrorKind::PermissionDenied => ConfigError::PermissionDenied {
                path: path.display().to_string(),
            },
            _ => ConfigError::InvalidFormat {
                details: format!("{}: {}", path.display(), e),
            },
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config = if is_json {
            Self::parse_json(&raw)?
        } else {
            Self::parse_toml(&raw)?
        };

        config.apply_bot_token_override(std::env::var(BOT_TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML without validating.
    pub fn parse_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Parses JSON without validating.
    pub fn parse_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidFormat {
            details: e.to_string(),
        })
    }

    pub fn apply_bot_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            debug!("Using bot token from {}", BOT_TOKEN_ENV);
            self.bot_token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bot_token".to_string(),
            });
        }
        if self.group_id.is_none() {
            return Err(ConfigError::MissingField {
                field: "group_id".to_string(),
            });
        }
        if self.subreddits.is_empty() {
            return Err(ConfigError::MissingField {
                field: "subreddits".to_string(),
            });
        }
        if let Some(blank) = self.subreddits.iter().find(|s| s.name().trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "subreddits".to_string(),
                value: format!("{:?}", blank),
            });
        }
        if self.weighted_subreddits().is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "every subreddit has weight 0".to_string(),
            });
        }
        if self.max_history_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_history_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.max_candidates == 0 || self.max_candidates > 100 {
            return Err(ConfigError::InvalidValue {
                field: "max_candidates".to_string(),
                value: self.max_candidates.to_string(),
            });
        }
        if self.tick_interval_seconds == 0 || self.tick_interval_seconds >= 60 {
            return Err(ConfigError::InvalidValue {
                field: "tick_interval_seconds".to_string(),
                value: self.tick_interval_seconds.to_string(),
            });
        }
        for (idx, trigger) in self.triggers.iter().enumerate() {
            validate_range(idx, "days", &trigger.days, 6)?;
            validate_range(idx, "hours", &trigger.hours, 23)?;
            validate_range(idx, "minutes", &trigger.minutes, 59)?;
        }
        self.title_filters()?;
        Ok(())
    }

    /// Chat the bot posts to; `test` selects the test group.
    pub fn chat_id(&self, test: bool) -> Result<i64, ConfigError> {
        let (field, value) = if test {
            ("test_group_id", self.test_group_id)
        } else {
            ("group_id", self.group_id)
        };
        value.ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
    }

    /// Subreddits eligible for random choice, with their weights.
    pub fn weighted_subreddits(&self) -> Vec<(&str, u32)> {
        self.subreddits
            .iter()
            .filter(|s| s.weight() > 0)
            .map(|s| (s.name(), s.weight()))
            .collect()
    }

    pub fn title_filters(&self) -> Result<HashMap<String, TitleFilter>, ConfigError> {
        self.filter_regex
            .iter()
            .map(|(subreddit, pattern)| {
                TitleFilter::new(pattern)
                    .map(|filter| (subreddit.clone(), filter))
                    .map_err(|e| ConfigError::InvalidValue {
                        field: format!("filter_regex.{}", subreddit),
                        value: e.to_string(),
                    })
            })
            .collect()
    }
}

fn validate_range(idx: usize, field: &str, values: &[u32], max: u32) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::MissingField {
            field: format!("triggers[{}].{}", idx, field),
        });
    }
    if let Some(bad) = values.iter().find(|v| **v > max) {
        return Err(ConfigError::InvalidValue {
            field: format!("triggers[{}].{}", idx, field),
            value: bad.to_string(),
        });
    }
    Ok(())
}
