use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// A fetched post that carries media the bot can forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePost {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub media_url: String,
    pub media_kind: MediaKind,
}

impl CandidatePost {
    pub fn caption(&self) -> String {
        format!("{}: {}", self.subreddit, self.title)
    }

    pub fn is_video(&self) -> bool {
        self.media_kind == MediaKind::Video
    }
}

/// Bare subreddit name, so `r/cats`, `/r/cats` and `cats` share one history key.
pub fn normalize_subreddit(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    name.strip_prefix("r/").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_subreddit_strips_prefix() {
        assert_eq!(normalize_subreddit("cats"), "cats");
        assert_eq!(normalize_subreddit("r/cats"), "cats");
        assert_eq!(normalize_subreddit(" /r/cats "), "cats");
        assert_eq!(normalize_subreddit("r/"), "");
    }

    #[test]
    fn test_caption_uses_subreddit_and_title() {
        let post = CandidatePost {
            id: "p1".to_string(),
            subreddit: "cats".to_string(),
            title: "Sleepy".to_string(),
            media_url: "https://i.redd.it/p1.jpg".to_string(),
            media_kind: MediaKind::Photo,
        };
        assert_eq!(post.caption(), "cats: Sleepy");
        assert!(!post.is_video());
    }
}
