//! Persistence gateway consumed by the tracker.
//!
//! Every call is blocking SQLite I/O; [`SqliteStore`] moves it onto the
//! blocking pool so the event loop is never stalled by the disk.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::attendance::AttendanceRepository;
use super::init::{migrate, open_db};
use super::meetings::MeetingRepository;
use super::schemas::{
    AttendanceRecord, ChannelId, Meeting, MeetingId, NewAttendance, NewMeeting, Recorded,
};

#[async_trait]
pub trait PunctualityStore: Send + Sync {
    async fn create_meeting(&self, meeting: NewMeeting) -> Result<MeetingId>;

    /// Most recent meeting for the channel on `date`, if any.
    async fn active_meeting(&self, channel_id: ChannelId, date: NaiveDate)
        -> Result<Option<Meeting>>;

    /// Idempotent per (meeting, member).
    async fn record_attendance(&self, attendance: NewAttendance) -> Result<Recorded>;

    async fn attendance_report(&self, meeting_id: MeetingId) -> Result<Vec<AttendanceRecord>>;

    async fn list_meetings(&self, limit: usize) -> Result<Vec<Meeting>>;
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_db(path)?;
        tracing::info!("Opened attendance database at {:?}", path);
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        migrate(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("Database connection lock poisoned"))?;
            op(&guard)
        })
        .await
        .context("Database task failed")?
    }
}

#[async_trait]
impl PunctualityStore for SqliteStore {
    async fn create_meeting(&self, meeting: NewMeeting) -> Result<MeetingId> {
        let id = self
            .with_conn(move |conn| MeetingRepository::insert(conn, &meeting))
            .await?;
        tracing::info!("Created meeting record with ID: {}", id);
        Ok(id)
    }

    async fn active_meeting(
        &self,
        channel_id: ChannelId,
        date: NaiveDate,
    ) -> Result<Option<Meeting>> {
        self.with_conn(move |conn| MeetingRepository::latest_for(conn, channel_id, date))
            .await
    }

    async fn record_attendance(&self, attendance: NewAttendance) -> Result<Recorded> {
        self.with_conn(move |conn| AttendanceRepository::record(conn, &attendance))
            .await
    }

    async fn attendance_report(&self, meeting_id: MeetingId) -> Result<Vec<AttendanceRecord>> {
        self.with_conn(move |conn| AttendanceRepository::for_meeting(conn, meeting_id))
            .await
    }

    async fn list_meetings(&self, limit: usize) -> Result<Vec<Meeting>> {
        self.with_conn(move |conn| MeetingRepository::list(conn, limit))
            .await
    }
}
