pub mod dispatcher;
pub mod schedule;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use schedule::{BackgroundService, TriggerSchedule};
