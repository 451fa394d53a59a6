use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type MeetingId = i64;
pub type RecordId = i64;
pub type ChannelId = u64;
pub type MemberId = u64;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A meeting as stored. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub channel_id: ChannelId,
    pub description: Option<String>,
}

impl Meeting {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Columns: id, meeting_date, start_time, channel_id, description
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let channel_id: i64 = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            date: parse_column(row, 1, |raw| NaiveDate::parse_from_str(raw, DATE_FORMAT))?,
            start_time: parse_column(row, 2, |raw| NaiveTime::parse_from_str(raw, TIME_FORMAT))?,
            channel_id: channel_id as u64,
            description: row.get(4)?,
        })
    }
}

/// Fields for a meeting that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeeting {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub channel_id: ChannelId,
    pub description: Option<String>,
}

impl NewMeeting {
    /// Meeting on `channel_id` starting at `starts_at`, truncated to whole seconds
    /// to match the stored precision.
    pub fn at(channel_id: ChannelId, starts_at: NaiveDateTime, description: Option<String>) -> Self {
        let starts_at = starts_at.with_nanosecond(0).unwrap_or(starts_at);
        Self {
            date: starts_at.date(),
            start_time: starts_at.time(),
            channel_id,
            description,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }
}

/// A member's arrival for one meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub meeting_id: MeetingId,
    pub member_id: MemberId,
    pub member_name: String,
    pub arrived_at: NaiveDateTime,
    pub late_minutes: u32,
    pub fee_amount: f64,
}

impl AttendanceRecord {
    /// Columns: id, meeting_id, member_id, member_name, arrived_at, late_minutes, fee_amount
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let member_id: i64 = row.get(2)?;
        Ok(Self {
            id: row.get(0)?,
            meeting_id: row.get(1)?,
            member_id: member_id as u64,
            member_name: row.get(3)?,
            arrived_at: parse_column(row, 4, |raw| {
                NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
            })?,
            late_minutes: row.get(5)?,
            fee_amount: row.get(6)?,
        })
    }
}

/// Attendance to be stored. Built through [`NewAttendance::new`], which
/// rejects values the table would refuse.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub meeting_id: MeetingId,
    pub member_id: MemberId,
    pub member_name: String,
    pub arrived_at: NaiveDateTime,
    pub late_minutes: u32,
    pub fee_amount: f64,
}

impl NewAttendance {
    pub fn new(
        meeting_id: MeetingId,
        member_id: MemberId,
        member_name: impl Into<String>,
        arrived_at: NaiveDateTime,
        late_minutes: u32,
        fee_amount: f64,
    ) -> Result<Self> {
        let member_name = member_name.into();
        if member_name.trim().is_empty() {
            bail!("Attendance for member {} has an empty display name", member_id);
        }
        if !fee_amount.is_finite() || fee_amount < 0.0 {
            bail!(
                "Attendance for member {} has an invalid fee: {}",
                member_id,
                fee_amount
            );
        }

        Ok(Self {
            meeting_id,
            member_id,
            member_name,
            arrived_at: arrived_at.with_nanosecond(0).unwrap_or(arrived_at),
            late_minutes,
            fee_amount,
        })
    }
}

/// Result of an idempotent attendance insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Created(RecordId),
    /// The (meeting, member) pair already had a record; nothing was written.
    Existing(RecordId),
}

impl Recorded {
    pub fn id(&self) -> RecordId {
        match self {
            Self::Created(id) | Self::Existing(id) => *id,
        }
    }
}

fn parse_column<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> chrono::ParseResult<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
