//! Meeting lifecycle and punctuality recording.
//!
//! All in-memory state lives in [`MeetingLifecycle`], which is owned by a
//! single event loop. The scheduler, arrival handler and command desk borrow
//! it mutably per event, so no locking is involved.

pub mod arrival;
pub mod calculator;
pub mod commands;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod report;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use arrival::{ArrivalHandler, ArrivalOutcome, JoinEvent};
pub use calculator::{assess, Lateness, LatenessPolicy};
pub use commands::{parse_command, Command, CommandDesk, CommandReply};
pub use error::{Result, TrackerError};
pub use lifecycle::{MeetingLifecycle, TickOutcome};
pub use notify::{build_notifier, Notifier};
pub use report::{MeetingReport, ReportBuilder};
pub use scheduler::{spawn_ticker, ReminderScheduler};
