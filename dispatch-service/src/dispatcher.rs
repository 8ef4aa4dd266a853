//! One dispatch cycle: fetch, select, send, record.

use picturebot_core::{
    normalize_subreddit, AppConfig, CoreError, ErrorReporter, HistoryFile, HistoryStore,
    Messenger, PostSelector, PostSource,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a dispatch cycle ended with. None of these stop the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent {
        subreddit: String,
        post_id: String,
    },
    NoEligibleCandidate {
        subreddit: String,
    },
    FetchFailed {
        subreddit: String,
        reason: String,
    },
    SendFailed {
        subreddit: String,
        post_id: String,
        reason: String,
    },
    NoSubreddit,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }
}

pub struct Dispatcher<S, M> {
    config: Arc<AppConfig>,
    source: S,
    messenger: M,
    selector: PostSelector,
    history: HistoryStore,
    history_file: Option<HistoryFile>,
    reporter: ErrorReporter,
    rng: fastrand::Rng,
}

impl<S: PostSource, M: Messenger> Dispatcher<S, M> {
    pub fn new(config: Arc<AppConfig>, source: S, messenger: M) -> Result<Self, CoreError> {
        let selector =
            PostSelector::new(config.selection).with_title_filters(config.title_filters()?);
        let history = HistoryStore::new(config.max_history_size);

        Ok(Self {
            config,
            source,
            messenger,
            selector,
            history,
            history_file: None,
            reporter: ErrorReporter::new(),
            rng: fastrand::Rng::new(),
        })
    }

    /// Loads the persisted history and writes it back after every send.
    pub fn with_history_file(mut self, history_file: HistoryFile) -> Result<Self, CoreError> {
        self.history = history_file.load(self.config.max_history_size)?;
        info!(
            "Loaded history for {} subreddits from {}",
            self.history.subreddits().len(),
            history_file.path().display()
        );
        self.history_file = Some(history_file);
        Ok(self)
    }

    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = history;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self.selector = self.selector.with_seed(seed);
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Weighted random choice among subreddits with a positive weight.
    pub fn pick_subreddit(&mut self) -> Option<String> {
        let weighted = self.config.weighted_subreddits();
        let total: u64 = weighted.iter().map(|(_, w)| u64::from(*w)).sum();
        if total == 0 {
            return None;
        }

        let mut roll = self.rng.u64(..total);
        for (name, weight) in weighted {
            let weight = u64::from(weight);
            if roll < weight {
                return Some(name.to_string());
            }
            roll -= weight;
        }
        None
    }

    /// Runs one cycle against `subreddit`, or a randomly picked one.
    ///
    /// History is only recorded once the messenger confirms delivery.
    pub async fn run_cycle(&mut self, subreddit: Option<&str>, chat_id: i64) -> DispatchOutcome {
        let subreddit = match subreddit {
            Some(name) => normalize_subreddit(name).to_string(),
            None => match self.pick_subreddit() {
                Some(name) => normalize_subreddit(&name).to_string(),
                None => {
                    warn!("No subreddit with a positive weight configured");
                    return DispatchOutcome::NoSubreddit;
                }
            },
        };
        info!("Starting dispatch cycle for r/{}", subreddit);

        let candidates = match self.source.fetch_candidates(&subreddit).await {
            Ok(candidates) if candidates.is_empty() => {
                warn!("r/{} returned no posts with media", subreddit);
                return DispatchOutcome::FetchFailed {
                    subreddit,
                    reason: "no posts with media".to_string(),
                };
            }
            Ok(candidates) => candidates,
            Err(e) => {
                self.reporter.report_error(&e);
                return DispatchOutcome::FetchFailed {
                    subreddit,
                    reason: e.to_string(),
                };
            }
        };

        let post = match self.selector.select(&subreddit, candidates, &self.history) {
            Some(post) => post,
            None => {
                warn!(
                    "Did not find an eligible post in r/{}, skipping this cycle",
                    subreddit
                );
                return DispatchOutcome::NoEligibleCandidate { subreddit };
            }
        };

        if let Err(e) = self.messenger.send_post(chat_id, &post).await {
            self.reporter.report_error(&e);
            return DispatchOutcome::SendFailed {
                subreddit,
                post_id: post.id,
                reason: e.to_string(),
            };
        }

        info!("Sent post {} from r/{} to chat {}", post.id, subreddit, chat_id);
        self.history.record(&subreddit, &post.id);
        if let Some(history_file) = &self.history_file {
            if let Err(e) = history_file.save(&self.history) {
                error!("Post {} was sent but history could not be saved", post.id);
                self.reporter.report_warning(&e);
            }
        }

        DispatchOutcome::Sent {
            subreddit,
            post_id: post.id,
        }
    }
}
