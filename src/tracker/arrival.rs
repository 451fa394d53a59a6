//! Handling of "member joined channel" events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::calculator::{self, Lateness, LatenessPolicy};
use super::lifecycle::MeetingLifecycle;
use super::notify::{announce, Notifier};
use crate::db::{
    ChannelId, MeetingId, MemberId, NewAttendance, PunctualityStore, RecordId, Recorded,
};

/// A member joined a voice channel at `joined_at` (local time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinEvent {
    pub member_id: MemberId,
    pub display_name: String,
    pub channel_id: ChannelId,
    pub joined_at: NaiveDateTime,
    /// Automated accounts are never tracked.
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrivalOutcome {
    IgnoredBot,
    UnmonitoredChannel,
    AlreadyTracked,
    NoMeetingToday,
    Recorded {
        meeting_id: MeetingId,
        record_id: RecordId,
        lateness: Lateness,
    },
    /// The store already held a record for this member and meeting.
    PreviouslyRecorded {
        meeting_id: MeetingId,
        record_id: RecordId,
    },
    PersistenceFailed,
}

pub struct ArrivalHandler {
    store: Arc<dyn PunctualityStore>,
    notifier: Arc<dyn Notifier>,
    policy: LatenessPolicy,
    monitored_channel: ChannelId,
    announcement_channel: ChannelId,
}

impl ArrivalHandler {
    pub fn new(
        store: Arc<dyn PunctualityStore>,
        notifier: Arc<dyn Notifier>,
        policy: LatenessPolicy,
        monitored_channel: ChannelId,
        announcement_channel: ChannelId,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
            monitored_channel,
            announcement_channel,
        }
    }

    pub async fn handle(
        &self,
        lifecycle: &mut MeetingLifecycle,
        event: &JoinEvent,
    ) -> ArrivalOutcome {
        let channel = event.channel_id;
        let member = event.member_id;

        if event.is_bot {
            return ArrivalOutcome::IgnoredBot;
        }
        if channel != self.monitored_channel {
            return ArrivalOutcome::UnmonitoredChannel;
        }
        if lifecycle.has_been_tracked(channel, member) {
            debug!("Member {} already tracked in channel {}", member, channel);
            return ArrivalOutcome::AlreadyTracked;
        }

        let today = event.joined_at.date();
        let meeting = match lifecycle.active_meeting_for(channel, today).await {
            Ok(Some(meeting)) => meeting,
            Ok(None) => {
                info!("No active meeting found for channel {} on {}", channel, today);
                return ArrivalOutcome::NoMeetingToday;
            }
            Err(e) => {
                warn!(
                    "Could not look up meeting for channel {}, skipping arrival of {}: {}",
                    channel, event.display_name, e
                );
                return ArrivalOutcome::NoMeetingToday;
            }
        };

        let lateness = calculator::assess(meeting.starts_at(), event.joined_at, &self.policy);

        let recorded = match NewAttendance::new(
            meeting.id,
            member,
            event.display_name.as_str(),
            event.joined_at,
            lateness.late_minutes,
            lateness.fee_amount,
        ) {
            Ok(attendance) => self.store.record_attendance(attendance).await,
            Err(e) => Err(e),
        };

        let recorded = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                error!(
                    "Error recording punctuality for {} in meeting {}: {:#}",
                    event.display_name, meeting.id, e
                );
                return ArrivalOutcome::PersistenceFailed;
            }
        };

        lifecycle.resume(channel, meeting.id);
        lifecycle.mark_tracked(channel, member);

        match recorded {
            Recorded::Existing(record_id) => {
                info!(
                    "{} already has a punctuality record for meeting {}",
                    event.display_name, meeting.id
                );
                ArrivalOutcome::PreviouslyRecorded {
                    meeting_id: meeting.id,
                    record_id,
                }
            }
            Recorded::Created(record_id) => {
                info!(
                    "Recorded punctuality for {} in meeting {}: {} minute(s) late",
                    event.display_name, meeting.id, lateness.late_minutes
                );
                let text = arrival_notice(&event.display_name, &lateness);
                announce(self.notifier.as_ref(), self.announcement_channel, &text).await;

                ArrivalOutcome::Recorded {
                    meeting_id: meeting.id,
                    record_id,
                    lateness,
                }
            }
        }
    }
}

fn arrival_notice(name: &str, lateness: &Lateness) -> String {
    if lateness.is_late() {
        format!(
            "{} joined {} minute(s) late. Fee: {:.2}",
            name, lateness.late_minutes, lateness.fee_amount
        )
    } else {
        format!("{name} joined on time")
    }
}
