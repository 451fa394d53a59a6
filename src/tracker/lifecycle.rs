//! Meeting lifecycle per monitored channel.
//!
//! Each channel cycles Idle → Pending → Active → Idle. A pending schedule
//! only becomes active through [`MeetingLifecycle::tick`]; an explicit start
//! goes straight to Active and discards whatever was pending.
//!
//! State lives in memory only and is lost on restart. Arrivals still resolve
//! today's meeting from the store, so tracking resumes after a restart.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{Result, TrackerError};
use crate::db::{ChannelId, Meeting, MeetingId, MemberId, NewMeeting, PunctualityStore};

/// Minutes past the scheduled start during which a pending meeting auto-starts.
pub const START_WINDOW_MINUTES: f64 = 2.0;
/// Minutes past the scheduled start after which a pending meeting is discarded.
pub const STALE_AFTER_MINUTES: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingMeeting {
    pub meeting_id: MeetingId,
    pub starts_at: NaiveDateTime,
    pub description: Option<String>,
}

/// The active meeting on a channel and the members already recorded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMeetingState {
    pub meeting_id: MeetingId,
    tracked: HashSet<MemberId>,
}

impl ActiveMeetingState {
    fn new(meeting_id: MeetingId) -> Self {
        Self {
            meeting_id,
            tracked: HashSet::new(),
        }
    }

    pub fn is_tracked(&self, member: MemberId) -> bool {
        self.tracked.contains(&member)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

#[derive(Debug, Default)]
struct ChannelSlot {
    pending: Option<PendingMeeting>,
    active: Option<ActiveMeetingState>,
}

impl ChannelSlot {
    fn is_idle(&self) -> bool {
        self.pending.is_none() && self.active.is_none()
    }
}

/// Channel-keyed scheduling state, owned by [`MeetingLifecycle`].
#[derive(Debug, Default)]
pub struct LifecycleStore {
    channels: HashMap<ChannelId, ChannelSlot>,
}

impl LifecycleStore {
    pub fn pending(&self, channel: ChannelId) -> Option<&PendingMeeting> {
        self.channels.get(&channel)?.pending.as_ref()
    }

    pub fn active(&self, channel: ChannelId) -> Option<&ActiveMeetingState> {
        self.channels.get(&channel)?.active.as_ref()
    }

    fn slot_mut(&mut self, channel: ChannelId) -> &mut ChannelSlot {
        self.channels.entry(channel).or_default()
    }

    /// Channels holding a pending meeting, in ascending order.
    fn pending_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .channels
            .iter()
            .filter(|(_, slot)| slot.pending.is_some())
            .map(|(channel, _)| *channel)
            .collect();
        channels.sort_unstable();
        channels
    }

    fn prune(&mut self, channel: ChannelId) {
        if self.channels.get(&channel).is_some_and(ChannelSlot::is_idle) {
            self.channels.remove(&channel);
        }
    }
}

/// What a scheduler tick decided for one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Inside the reminder window. Repeats on every tick until the start.
    Reminder {
        channel: ChannelId,
        meeting_id: MeetingId,
        minutes_until: f64,
        description: Option<String>,
    },
    Started {
        channel: ChannelId,
        meeting_id: MeetingId,
        starts_at: NaiveDateTime,
        description: Option<String>,
    },
    /// Never started; dropped without notification.
    Expired {
        channel: ChannelId,
        meeting_id: MeetingId,
        starts_at: NaiveDateTime,
    },
}

impl TickOutcome {
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::Reminder { channel, .. }
            | Self::Started { channel, .. }
            | Self::Expired { channel, .. } => *channel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    Remind,
    Start,
    Expire,
}

fn classify(minutes_until: f64, reminder_threshold: f64) -> Option<TickAction> {
    if minutes_until > 0.0 && minutes_until <= reminder_threshold {
        Some(TickAction::Remind)
    } else if (-START_WINDOW_MINUTES..=0.0).contains(&minutes_until) {
        Some(TickAction::Start)
    } else if minutes_until < -STALE_AFTER_MINUTES {
        Some(TickAction::Expire)
    } else {
        None
    }
}

/// Fractional minutes from `now` until `starts_at`; negative once started.
pub fn minutes_until(now: NaiveDateTime, starts_at: NaiveDateTime) -> f64 {
    (starts_at - now).num_milliseconds() as f64 / 60_000.0
}

pub struct MeetingLifecycle {
    state: LifecycleStore,
    store: Arc<dyn PunctualityStore>,
    reminder_threshold_minutes: u32,
}

impl MeetingLifecycle {
    pub fn new(store: Arc<dyn PunctualityStore>, reminder_threshold_minutes: u32) -> Self {
        Self {
            state: LifecycleStore::default(),
            store,
            reminder_threshold_minutes,
        }
    }

    pub fn state(&self) -> &LifecycleStore {
        &self.state
    }

    /// Persist a meeting starting at `starts_at` and hold it as pending.
    pub async fn schedule(
        &mut self,
        channel: ChannelId,
        starts_at: NaiveDateTime,
        description: Option<String>,
    ) -> Result<MeetingId> {
        if self.state.pending(channel).is_some() {
            return Err(TrackerError::AlreadyScheduled { channel });
        }

        let meeting = NewMeeting::at(channel, starts_at, description);
        let starts_at = meeting.starts_at();
        let description = meeting.description.clone();
        let meeting_id = self
            .store
            .create_meeting(meeting)
            .await
            .map_err(TrackerError::persistence)?;

        self.state.slot_mut(channel).pending = Some(PendingMeeting {
            meeting_id,
            starts_at,
            description,
        });

        info!(
            "Meeting {} scheduled for {} in channel {}",
            meeting_id, starts_at, channel
        );
        Ok(meeting_id)
    }

    pub fn cancel(&mut self, channel: ChannelId) -> Result<PendingMeeting> {
        let pending = self
            .state
            .channels
            .get_mut(&channel)
            .and_then(|slot| slot.pending.take())
            .ok_or(TrackerError::NothingScheduled { channel })?;
        self.state.prune(channel);

        info!(
            "Cancelled scheduled meeting {} ({}) in channel {}",
            pending.meeting_id, pending.starts_at, channel
        );
        Ok(pending)
    }

    /// Persist a meeting starting `now` and make it active right away.
    /// Any pending schedule for the channel is discarded.
    pub async fn start_immediately(
        &mut self,
        channel: ChannelId,
        description: Option<String>,
        now: NaiveDateTime,
    ) -> Result<MeetingId> {
        let meeting_id = self
            .store
            .create_meeting(NewMeeting::at(channel, now, description))
            .await
            .map_err(TrackerError::persistence)?;

        let slot = self.state.slot_mut(channel);
        slot.active = Some(ActiveMeetingState::new(meeting_id));
        if let Some(preempted) = slot.pending.take() {
            info!(
                "Explicit start of meeting {} replaced pending meeting {} in channel {}",
                meeting_id, preempted.meeting_id, channel
            );
        }

        info!("Meeting {} started at {} in channel {}", meeting_id, now, channel);
        Ok(meeting_id)
    }

    /// Advance every pending meeting against `now`.
    ///
    /// Reminders clear the channel's tracked set and leave the schedule in
    /// place; starting and expiring both remove it, so a repeated tick with
    /// the same `now` cannot start or expire a meeting twice.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<TickOutcome> {
        let threshold = f64::from(self.reminder_threshold_minutes);
        let mut outcomes = Vec::new();

        for channel in self.state.pending_channels() {
            let slot = self.state.slot_mut(channel);
            let Some(pending) = slot.pending.as_ref() else {
                continue;
            };
            let minutes_until = minutes_until(now, pending.starts_at);

            match classify(minutes_until, threshold) {
                Some(TickAction::Remind) => {
                    if let Some(active) = slot.active.as_mut() {
                        active.tracked.clear();
                    }
                    outcomes.push(TickOutcome::Reminder {
                        channel,
                        meeting_id: pending.meeting_id,
                        minutes_until,
                        description: pending.description.clone(),
                    });
                }
                Some(TickAction::Start) => {
                    if let Some(pending) = slot.pending.take() {
                        slot.active = Some(ActiveMeetingState::new(pending.meeting_id));
                        info!(
                            "Auto-started meeting {} scheduled for {}",
                            pending.meeting_id, pending.starts_at
                        );
                        outcomes.push(TickOutcome::Started {
                            channel,
                            meeting_id: pending.meeting_id,
                            starts_at: pending.starts_at,
                            description: pending.description,
                        });
                    }
                }
                Some(TickAction::Expire) => {
                    if let Some(pending) = slot.pending.take() {
                        warn!(
                            "Removing stale scheduled meeting {} from {}",
                            pending.meeting_id, pending.starts_at
                        );
                        outcomes.push(TickOutcome::Expired {
                            channel,
                            meeting_id: pending.meeting_id,
                            starts_at: pending.starts_at,
                        });
                    }
                    self.state.prune(channel);
                }
                None => {
                    debug!(
                        "Meeting {} in channel {} is {:.1} minutes out, nothing to do",
                        pending.meeting_id, channel, minutes_until
                    );
                }
            }
        }

        outcomes
    }

    /// Most recent persisted meeting for the channel on `date`.
    pub async fn active_meeting_for(
        &self,
        channel: ChannelId,
        date: NaiveDate,
    ) -> Result<Option<Meeting>> {
        self.store
            .active_meeting(channel, date)
            .await
            .map_err(TrackerError::persistence)
    }

    pub fn has_been_tracked(&self, channel: ChannelId, member: MemberId) -> bool {
        self.state
            .active(channel)
            .is_some_and(|active| active.is_tracked(member))
    }

    /// Record `member` as seen for the channel's active meeting.
    /// Returns false when the channel has no active meeting.
    pub fn mark_tracked(&mut self, channel: ChannelId, member: MemberId) -> bool {
        match self
            .state
            .channels
            .get_mut(&channel)
            .and_then(|slot| slot.active.as_mut())
        {
            Some(active) => {
                active.tracked.insert(member);
                true
            }
            None => false,
        }
    }

    /// Adopt a persisted meeting as active when the channel has none in
    /// memory, e.g. after a restart in the middle of a meeting.
    pub fn resume(&mut self, channel: ChannelId, meeting_id: MeetingId) {
        let slot = self.state.slot_mut(channel);
        if slot.active.is_none() {
            info!(
                "Resuming tracking of meeting {} in channel {}",
                meeting_id, channel
            );
            slot.active = Some(ActiveMeetingState::new(meeting_id));
        }
    }
}
