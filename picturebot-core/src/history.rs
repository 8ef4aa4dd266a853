//! Bounded per-subreddit history of sent post identifiers.
//!
//! Every subreddit keeps its own FIFO of at most `max_size` identifiers,
//! oldest first. Recording past the bound evicts from the front.

use std::collections::{BTreeMap, HashMap, VecDeque};

pub const DEFAULT_MAX_HISTORY_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    max_size: usize,
    entries: HashMap<String, VecDeque<String>>,
}

impl HistoryStore {
    /// Creates an empty store. A `max_size` of zero is treated as one.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: HashMap::new(),
        }
    }

    /// Builds a store from persisted lists (oldest first), keeping only the
    /// newest `max_size` identifiers of each.
    pub fn from_snapshot(snapshot: BTreeMap<String, Vec<String>>, max_size: usize) -> Self {
        let mut store = Self::new(max_size);
        for (subreddit, post_ids) in snapshot {
            for post_id in post_ids {
                store.record(&subreddit, &post_id);
            }
        }
        store
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn contains(&self, subreddit: &str, post_id: &str) -> bool {
        self.entries
            .get(subreddit)
            .map(|ids| ids.iter().any(|id| id == post_id))
            .unwrap_or(false)
    }

    pub fn record(&mut self, subreddit: &str, post_id: &str) {
        let ids = self.entries.entry(subreddit.to_string()).or_default();
        ids.push_back(post_id.to_string());
        while ids.len() > self.max_size {
            ids.pop_front();
        }
    }

    /// Identifiers recorded for `subreddit`, oldest first.
    pub fn entries(&self, subreddit: &str) -> Vec<String> {
        self.entries
            .get(subreddit)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, subreddit: &str) -> usize {
        self.entries.get(subreddit).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(VecDeque::is_empty)
    }

    pub fn subreddits(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(subreddit, ids)| (subreddit.clone(), ids.iter().cloned().collect()))
            .collect()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_SIZE)
    }
}
