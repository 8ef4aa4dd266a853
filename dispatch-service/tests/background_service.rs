use chrono::{NaiveDate, NaiveDateTime};
use dispatch_service::{BackgroundService, Dispatcher, TriggerSchedule};
use picturebot_core::{AppConfig, CandidatePost, CoreError, MediaKind, Messenger, PostSource};
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

struct StaticSource;

impl PostSource for StaticSource {
    async fn fetch_candidates(&self, subreddit: &str) -> Result<Vec<CandidatePost>, CoreError> {
        Ok((0..5)
            .map(|i| CandidatePost {
                id: format!("{}-{}", subreddit, i),
                subreddit: subreddit.to_string(),
                title: format!("post {}", i),
                media_url: format!("https://i.redd.it/{}.jpg", i),
                media_kind: MediaKind::Photo,
            })
            .collect())
    }
}

#[derive(Default)]
struct CountingMessenger {
    sent: Cell<usize>,
}

impl Messenger for CountingMessenger {
    async fn send_post(&self, _chat_id: i64, _post: &CandidatePost) -> Result<(), CoreError> {
        self.sent.set(self.sent.get() + 1);
        Ok(())
    }
}

fn config() -> Arc<AppConfig> {
    let raw = r#"
bot_token = "t"
group_id = -100
subreddits = ["cats"]

[[triggers]]
days = [0, 1, 2, 3, 4, 5, 6]
hours = [10]
minutes = [15]
subreddit = "earthporn"

[[triggers]]
days = [0]
hours = [23]
minutes = [59]
"#;
    let config = AppConfig::parse_toml(raw).unwrap();
    config.validate().unwrap();
    Arc::new(config)
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 3)
        .unwrap()
        .and_hms_opt(10, 15, 0)
        .unwrap()
}

#[tokio::test]
async fn test_due_trigger_runs_once_until_shutdown() {
    let config = config();
    let mut dispatcher =
        Dispatcher::new(config.clone(), StaticSource, CountingMessenger::default()).unwrap();
    let mut schedule = TriggerSchedule::new(config.triggers.clone());
    let service = BackgroundService::new(Duration::from_millis(5));

    let cycles = service
        .run_with_clock(
            &mut dispatcher,
            &mut schedule,
            -100,
            None,
            tokio::time::sleep(Duration::from_millis(60)),
            fixed_clock,
        )
        .await;

    assert_eq!(cycles, 1);
    // The trigger's own subreddit overrides the default.
    assert_eq!(dispatcher.history().len("earthporn"), 1);
    assert_eq!(dispatcher.history().len("cats"), 0);
}

#[tokio::test]
async fn test_immediate_shutdown_runs_nothing_when_not_due() {
    let config = config();
    let mut dispatcher =
        Dispatcher::new(config.clone(), StaticSource, CountingMessenger::default()).unwrap();
    let mut schedule = TriggerSchedule::new(config.triggers.clone());
    let service = BackgroundService::from_seconds(1);

    let not_due = || {
        NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    };
    let cycles = service
        .run_with_clock(
            &mut dispatcher,
            &mut schedule,
            -100,
            Some("cats"),
            tokio::time::sleep(Duration::from_millis(20)),
            not_due,
        )
        .await;

    assert_eq!(cycles, 0);
    assert!(dispatcher.history().is_empty());
}
