//! Test doubles shared by the tracker's unit tests.

use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

use super::error::{Result, TrackerError};
use super::notify::Notifier;
use crate::db::{
    AttendanceRecord, ChannelId, Meeting, MeetingId, NewAttendance, NewMeeting, PunctualityStore,
    Recorded, SqliteStore,
};

pub const MONITORED: ChannelId = 100;
pub const ANNOUNCEMENTS: ChannelId = 200;

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(ChannelId, String)>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel: ChannelId, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((channel, text.to_string()));
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _channel: ChannelId, _text: &str) -> Result<()> {
        Err(TrackerError::notification("sink unavailable"))
    }
}

/// A store whose every call fails, as if the database were unreachable.
pub struct UnreachableStore;

#[async_trait]
impl PunctualityStore for UnreachableStore {
    async fn create_meeting(&self, _meeting: NewMeeting) -> AnyResult<MeetingId> {
        Err(anyhow!("database unreachable"))
    }

    async fn active_meeting(
        &self,
        _channel_id: ChannelId,
        _date: NaiveDate,
    ) -> AnyResult<Option<Meeting>> {
        Err(anyhow!("database unreachable"))
    }

    async fn record_attendance(&self, _attendance: NewAttendance) -> AnyResult<Recorded> {
        Err(anyhow!("database unreachable"))
    }

    async fn attendance_report(&self, _meeting_id: MeetingId) -> AnyResult<Vec<AttendanceRecord>> {
        Err(anyhow!("database unreachable"))
    }

    async fn list_meetings(&self, _limit: usize) -> AnyResult<Vec<Meeting>> {
        Err(anyhow!("database unreachable"))
    }
}

/// Reads go to a real store; attendance writes are rejected.
pub struct ReadOnlyStore {
    pub inner: Arc<SqliteStore>,
}

#[async_trait]
impl PunctualityStore for ReadOnlyStore {
    async fn create_meeting(&self, meeting: NewMeeting) -> AnyResult<MeetingId> {
        self.inner.create_meeting(meeting).await
    }

    async fn active_meeting(
        &self,
        channel_id: ChannelId,
        date: NaiveDate,
    ) -> AnyResult<Option<Meeting>> {
        self.inner.active_meeting(channel_id, date).await
    }

    async fn record_attendance(&self, _attendance: NewAttendance) -> AnyResult<Recorded> {
        Err(anyhow!("write rejected"))
    }

    async fn attendance_report(&self, meeting_id: MeetingId) -> AnyResult<Vec<AttendanceRecord>> {
        self.inner.attendance_report(meeting_id).await
    }

    async fn list_meetings(&self, limit: usize) -> AnyResult<Vec<Meeting>> {
        self.inner.list_meetings(limit).await
    }
}
