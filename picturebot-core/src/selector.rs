//! Candidate filtering and selection.
//!
//! Selection never touches the history; the caller records a post only once
//! it has actually been delivered.

use crate::{CandidatePost, HistoryStore};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SelectionPolicy {
    /// Uniform random choice among eligible candidates.
    #[default]
    #[serde(rename = "random")]
    Random,
    /// First eligible candidate in source order.
    #[serde(rename = "first", alias = "first_eligible")]
    FirstEligible,
}

/// Title pattern that must match at the start of a post title.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    pattern: String,
    regex: Regex,
}

impl TitleFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, title: &str) -> bool {
        self.regex.is_match(title)
    }
}

#[derive(Debug, Clone)]
pub struct PostSelector {
    policy: SelectionPolicy,
    title_filters: HashMap<String, TitleFilter>,
    rng: fastrand::Rng,
}

impl PostSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            title_filters: HashMap::new(),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_title_filters(mut self, title_filters: HashMap<String, TitleFilter>) -> Self {
        self.title_filters = title_filters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Candidates not yet sent for `subreddit` whose titles pass its filter,
    /// in source order.
    pub fn eligible(
        &self,
        subreddit: &str,
        candidates: Vec<CandidatePost>,
        history: &HistoryStore,
    ) -> Vec<CandidatePost> {
        let filter = self.title_filters.get(subreddit);

        candidates
            .into_iter()
            .filter(|post| {
                if history.contains(subreddit, &post.id) {
                    debug!("Skipping already sent post {} in r/{}", post.id, subreddit);
                    return false;
                }
                match filter {
                    Some(filter) if !filter.matches(&post.title) => {
                        info!(
                            "Title '{}' does not match regex '{}'",
                            post.title,
                            filter.pattern()
                        );
                        false
                    }
                    _ => true,
                }
            })
            .collect()
    }

    /// Picks one eligible candidate, or `None` when nothing is left after filtering.
    pub fn select(
        &mut self,
        subreddit: &str,
        candidates: Vec<CandidatePost>,
        history: &HistoryStore,
    ) -> Option<CandidatePost> {
        let total = candidates.len();
        let mut eligible = self.eligible(subreddit, candidates, history);
        info!(
            "{} of {} candidates eligible in r/{}",
            eligible.len(),
            total,
            subreddit
        );

        if eligible.is_empty() {
            return None;
        }

        let index = match self.policy {
            SelectionPolicy::Random => self.rng.usize(..eligible.len()),
            SelectionPolicy::FirstEligible => 0,
        };
        Some(eligible.swap_remove(index))
    }
}

impl Default for PostSelector {
    fn default() -> Self {
        Self::new(SelectionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaKind;

    fn post(id: &str, title: &str) -> CandidatePost {
        CandidatePost {
            id: id.to_string(),
            subreddit: "cats".to_string(),
            title: title.to_string(),
            media_url: format!("https://i.redd.it/{id}.jpg"),
            media_kind: MediaKind::Photo,
        }
    }

    fn history_with(ids: &[&str]) -> HistoryStore {
        let mut history = HistoryStore::new(3);
        for id in ids {
            history.record("cats", id);
        }
        history
    }

    #[test]
    fn test_filters_history_and_selects_remaining() {
        let history = history_with(&["p2", "p3", "p4"]);
        let candidates = vec![post("p2", "a"), post("p3", "b"), post("p5", "c")];

        let mut selector = PostSelector::new(SelectionPolicy::Random).with_seed(7);
        let selected = selector.select("cats", candidates, &history);
        assert_eq!(selected.map(|p| p.id), Some("p5".to_string()));
    }

    #[test]
    fn test_all_in_history_returns_none() {
        let history = history_with(&["p1", "p2"]);
        let candidates = vec![post("p1", "a"), post("p2", "b")];

        let mut selector = PostSelector::default();
        assert!(selector.select("cats", candidates, &history).is_none());
    }

    #[test]
    fn test_empty_candidates_returns_none() {
        let mut selector = PostSelector::default();
        assert!(selector
            .select("cats", Vec::new(), &HistoryStore::default())
            .is_none());
    }

    #[test]
    fn test_first_eligible_is_deterministic() {
        let history = history_with(&["p1"]);
        let candidates = vec![post("p1", "a"), post("p2", "b"), post("p3", "c")];

        let mut selector = PostSelector::new(SelectionPolicy::FirstEligible);
        let selected = selector.select("cats", candidates, &history).unwrap();
        assert_eq!(selected.id, "p2");
    }

    #[test]
    fn test_random_never_returns_history_entry() {
        let history = history_with(&["p1", "p3"]);
        let mut selector = PostSelector::new(SelectionPolicy::Random).with_seed(42);

        for _ in 0..200 {
            let candidates = vec![
                post("p1", "a"),
                post("p2", "b"),
                post("p3", "c"),
                post("p4", "d"),
            ];
            let selected = selector.select("cats", candidates, &history).unwrap();
            assert!(!history.contains("cats", &selected.id));
        }
    }

    #[test]
    fn test_history_of_other_subreddit_is_ignored() {
        let mut history = HistoryStore::new(3);
        history.record("dogs", "p1");

        let mut selector = PostSelector::new(SelectionPolicy::FirstEligible);
        let selected = selector.select("cats", vec![post("p1", "a")], &history);
        assert_eq!(selected.map(|p| p.id), Some("p1".to_string()));
    }

    #[test]
    fn test_title_filter_anchors_at_start() {
        let filter = TitleFilter::new("(?i)cute").unwrap();
        assert!(filter.matches("Cute kitten"));
        assert!(!filter.matches("A cute kitten"));
    }

    #[test]
    fn test_title_filter_applies_per_subreddit() {
        let mut filters = HashMap::new();
        filters.insert("cats".to_string(), TitleFilter::new(r"\[OC\]").unwrap());

        let selector =
            PostSelector::new(SelectionPolicy::FirstEligible).with_title_filters(filters);
        let eligible = selector.eligible(
            "cats",
            vec![post("p1", "Sleepy cat"), post("p2", "[OC] Sleepy cat")],
            &HistoryStore::default(),
        );
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "p2");

        let unfiltered = selector.eligible(
            "dogs",
            vec![post("p1", "Sleepy dog")],
            &HistoryStore::default(),
        );
        assert_eq!(unfiltered.len(), 1);
    }
}
