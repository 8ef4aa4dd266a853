use crate::{CandidatePost, CoreError};

/// Source of candidate posts for a subreddit.
pub trait PostSource {
    async fn fetch_candidates(&self, subreddit: &str) -> Result<Vec<CandidatePost>, CoreError>;
}

/// Delivers a selected post to a chat.
pub trait Messenger {
    async fn send_post(&self, chat_id: i64, post: &CandidatePost) -> Result<(), CoreError>;
}
