use crate::dispatcher::{DispatchOutcome, Dispatcher};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use picturebot_core::{Messenger, PostSource, Trigger};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Configured triggers plus the hour each one last fired in.
#[derive(Debug, Clone)]
pub struct TriggerSchedule {
    triggers: Vec<Trigger>,
    last_fired: Vec<Option<(NaiveDate, u32)>>,
}

impl TriggerSchedule {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        let last_fired = vec![None; triggers.len()];
        Self {
            triggers,
            last_fired,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Triggers that match `now` and have not fired yet in this hour.
    /// Returned triggers are marked as fired.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<Trigger> {
        let weekday = now.weekday().num_days_from_monday();
        let hour_key = (now.date(), now.hour());
        let mut due = Vec::new();

        for (trigger, last_fired) in self.triggers.iter().zip(self.last_fired.iter_mut()) {
            let matches = trigger.days.contains(&weekday)
                && trigger.hours.contains(&now.hour())
                && trigger.minutes.contains(&now.minute());
            if matches && *last_fired != Some(hour_key) {
                *last_fired = Some(hour_key);
                due.push(trigger.clone());
            }
        }
        due
    }
}

pub struct BackgroundService {
    tick_interval: Duration,
}

impl BackgroundService {
    pub fn new(tick_interval: Duration) -> Self {
        Self { tick_interval }
    }

    pub fn from_seconds(tick_interval_seconds: u64) -> Self {
        Self::new(Duration::from_secs(tick_interval_seconds))
    }

    /// Runs due triggers against the local clock until `shutdown` resolves.
    /// Returns the number of cycles run.
    pub async fn run<S, M, F>(
        &self,
        dispatcher: &mut Dispatcher<S, M>,
        schedule: &mut TriggerSchedule,
        chat_id: i64,
        default_subreddit: Option<&str>,
        shutdown: F,
    ) -> usize
    where
        S: PostSource,
        M: Messenger,
        F: Future<Output = ()>,
    {
        self.run_with_clock(
            dispatcher,
            schedule,
            chat_id,
            default_subreddit,
            shutdown,
            || Local::now().naive_local(),
        )
        .await
    }

    pub async fn run_with_clock<S, M, F, C>(
        &self,
        dispatcher: &mut Dispatcher<S, M>,
        schedule: &mut TriggerSchedule,
        chat_id: i64,
        default_subreddit: Option<&str>,
        shutdown: F,
        clock: C,
    ) -> usize
    where
        S: PostSource,
        M: Messenger,
        F: Future<Output = ()>,
        C: Fn() -> NaiveDateTime,
    {
        info!(
            "Background service started, checking triggers every {:?}",
            self.tick_interval
        );
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut cycles = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping background service");
                    break;
                }
                _ = ticker.tick() => {
                    let now = clock();
                    for trigger in schedule.due(now) {
                        let subreddit = trigger.subreddit.as_deref().or(default_subreddit);
                        debug!("Trigger fired at {} for {:?}", now, subreddit);
                        let outcome = dispatcher.run_cycle(subreddit, chat_id).await;
                        if !matches!(outcome, DispatchOutcome::Sent { .. }) {
                            info!("Cycle finished without sending: {:?}", outcome);
                        }
                        cycles += 1;
                    }
                }
            }
        }
        cycles
    }
}
