use picturebot_core::{
    normalize_subreddit, CandidatePost, ConfigError, CoreError, MediaKind, PostSource,
    RedditApiError, RedditSettings,
};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const REDDIT_PUBLIC_BASE: &str = "https://www.reddit.com";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// Fields of a link post the bot cares about. Everything is optional on the
/// wire so that one odd post does not spoil the whole listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub url: Option<String>,
    pub permalink: String,
    pub created_utc: f64,
    pub over_18: bool,
    pub stickied: bool,
    pub is_video: bool,
    pub preview: Option<RedditPreview>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditPreview {
    pub enabled: bool,
    pub reddit_video_preview: Option<RedditVideoPreview>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditVideoPreview {
    pub fallback_url: String,
}

impl RedditPostData {
    /// Converts the post into something the bot can send, keyed by the
    /// subreddit name it was requested under.
    ///
    /// Posts without a preview have no media and yield `None`. A video preview
    /// wins over the post link.
    pub fn into_candidate(self, subreddit: &str) -> Option<CandidatePost> {
        let preview = match self.preview {
            Some(preview) => preview,
            None => {
                debug!("No parsable media found in post {}", self.id);
                return None;
            }
        };

        let (media_url, media_kind) = match preview.reddit_video_preview {
            Some(video) => (video.fallback_url, MediaKind::Video),
            None => (self.url.unwrap_or_default(), MediaKind::Photo),
        };

        if self.id.is_empty() || self.title.is_empty() || media_url.is_empty() {
            debug!("Post {:?} is missing id, title or media url", self.id);
            return None;
        }

        Some(CandidatePost {
            id: self.id,
            subreddit: subreddit.to_string(),
            title: self.title,
            media_url,
            media_kind,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RedditClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_candidates: u32,
}

impl RedditClientConfig {
    pub fn new(user_agent: String) -> Self {
        Self {
            base_url: REDDIT_PUBLIC_BASE.to_string(),
            user_agent,
            timeout: Duration::from_secs(30),
            max_candidates: 10,
        }
    }

    pub fn from_settings(settings: &RedditSettings, max_candidates: u32) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            user_agent: settings.user_agent.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
            max_candidates,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: u32) -> Self {
        self.max_candidates = max_candidates;
        self
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: Url,
    user_agent: String,
    max_candidates: u32,
}

impl RedditApiClient {
    pub fn new(config: RedditClientConfig) -> Result<Self, CoreError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ConfigError::InvalidValue {
            field: "reddit.base_url".to_string(),
            value: format!("{} ({})", config.base_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            user_agent: config.user_agent,
            max_candidates: config.max_candidates,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn max_candidates(&self) -> u32 {
        self.max_candidates
    }

    async fn make_request(
        &self,
        endpoint: &str,
        subreddit: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| CoreError::InvalidInput {
                message: format!("Invalid endpoint {}: {}", endpoint, e),
            })?;

        info!("Making Reddit request: GET {}", endpoint);
        let response = match self.http_client.get(url).query(query_params).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let err = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                resource: format!("r/{}", subreddit),
            },
            StatusCode::NOT_FOUND => RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            },
            s if s.is_server_error() => RedditApiError::ServerError {
                status_code: s.as_u16(),
            },
            s => RedditApiError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status_code: s.as_u16(),
            },
        };
        Err(CoreError::RedditApi(err))
    }

    /// Newest posts of `subreddit`, at most `limit` of them.
    pub async fn get_new_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let subreddit = normalize_subreddit(subreddit);
        if subreddit.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "subreddit name is empty".to_string(),
            });
        }

        let endpoint = format!("r/{}/new.json", subreddit);
        let limit_str = limit.to_string();
        let params = [("sort", "new"), ("limit", limit_str.as_str())];

        let response = self.make_request(&endpoint, subreddit, &params).await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }
}

impl PostSource for RedditApiClient {
    async fn fetch_candidates(&self, subreddit: &str) -> Result<Vec<CandidatePost>, CoreError> {
        let subreddit = normalize_subreddit(subreddit);
        let listing = self.get_new_posts(subreddit, self.max_candidates).await?;
        let total = listing.data.children.len();

        let candidates: Vec<CandidatePost> = listing
            .data
            .children
            .into_iter()
            .take(self.max_candidates as usize)
            .filter_map(|child| child.data.into_candidate(subreddit))
            .collect();

        if candidates.len() < total {
            info!(
                "Skipped {} posts without media in r/{}",
                total - candidates.len(),
                subreddit
            );
        }
        Ok(candidates)
    }
}
