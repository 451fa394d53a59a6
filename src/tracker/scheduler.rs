//! Periodic reminder scheduler.
//!
//! A ticker task produces the current time on a fixed interval; the event
//! loop hands each tick to [`ReminderScheduler::run_tick`], which advances
//! the lifecycle and posts reminders and start notices.

use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::calculator::LatenessPolicy;
use super::lifecycle::{MeetingLifecycle, TickOutcome};
use super::notify::{announce, Notifier};
use crate::db::ChannelId;

pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    announcement_channel: ChannelId,
    policy: LatenessPolicy,
}

impl ReminderScheduler {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        announcement_channel: ChannelId,
        policy: LatenessPolicy,
    ) -> Self {
        Self {
            notifier,
            announcement_channel,
            policy,
        }
    }

    /// Apply one tick. Each outcome is announced on its own, so a failed
    /// delivery for one channel does not stop the others.
    pub async fn run_tick(
        &self,
        lifecycle: &mut MeetingLifecycle,
        now: NaiveDateTime,
    ) -> Vec<TickOutcome> {
        let outcomes = lifecycle.tick(now);

        for outcome in &outcomes {
            match outcome {
                TickOutcome::Reminder { meeting_id, .. } => {
                    info!("Sending reminder for meeting {}", meeting_id);
                }
                TickOutcome::Started { meeting_id, .. } => {
                    info!("Announcing start of meeting {}", meeting_id);
                }
                TickOutcome::Expired { .. } => continue,
            }

            if let Some(text) = self.message_for(outcome) {
                if !announce(self.notifier.as_ref(), self.announcement_channel, &text).await {
                    warn!(
                        "Tick notice for channel {} was not delivered",
                        outcome.channel()
                    );
                }
            }
        }

        outcomes
    }

    fn message_for(&self, outcome: &TickOutcome) -> Option<String> {
        match outcome {
            TickOutcome::Reminder {
                minutes_until,
                description,
                ..
            } => Some(format!(
                "REMINDER: Meeting starts in {} minutes{}! \
                 Please join the voice channel on time to avoid late fees.",
                minutes_until.trunc() as i64,
                description_suffix(description.as_deref()),
            )),
            TickOutcome::Started {
                starts_at,
                description,
                ..
            } => Some(start_notice(*starts_at, description.as_deref(), &self.policy)),
            TickOutcome::Expired { .. } => None,
        }
    }
}

pub(crate) fn description_suffix(description: Option<&str>) -> String {
    description
        .map(|text| format!(" - {text}"))
        .unwrap_or_default()
}

pub(crate) fn start_notice(
    starts_at: NaiveDateTime,
    description: Option<&str>,
    policy: &LatenessPolicy,
) -> String {
    format!(
        "MEETING STARTED at {}{}\nGrace period: {} minutes\nLate fee: {:.2} per minute",
        starts_at.format("%H:%M:%S"),
        description_suffix(description),
        policy.grace_period_minutes,
        policy.fee_per_minute,
    )
}

/// Send `event(now)` into `tx` every `period` until the receiver is dropped.
/// The first tick fires immediately.
pub fn spawn_ticker<T>(
    period: Duration,
    tx: mpsc::Sender<T>,
    event: fn(NaiveDateTime) -> T,
) -> JoinHandle<()>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let now = Local::now().naive_local();
            if tx.send(event(now)).await.is_err() {
                debug!("Event loop closed, stopping scheduler ticker");
                break;
            }
        }
    })
}
