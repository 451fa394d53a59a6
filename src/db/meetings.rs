//! Meeting record persistence.
//!
//! CRUD operations for the `meetings` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::schemas::{ChannelId, Meeting, MeetingId, NewMeeting, DATE_FORMAT, TIME_FORMAT};

const MEETING_COLUMNS: &str = "id, meeting_date, start_time, channel_id, description";

/// Repository for meeting records.
pub struct MeetingRepository;

impl MeetingRepository {
    /// Insert a new meeting record.
    /// Returns the new meeting ID.
    pub fn insert(conn: &Connection, meeting: &NewMeeting) -> Result<MeetingId> {
        conn.execute(
            "INSERT INTO meetings (meeting_date, start_time, channel_id, description) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                meeting.date.format(DATE_FORMAT).to_string(),
                meeting.start_time.format(TIME_FORMAT).to_string(),
                meeting.channel_id as i64,
                meeting.description,
            ],
        )
        .context("Failed to insert meeting")?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a meeting by ID.
    pub fn get(conn: &Connection, id: MeetingId) -> Result<Option<Meeting>> {
        conn.query_row(
            &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"),
            params![id],
            Meeting::from_row,
        )
        .optional()
        .context("Failed to query meeting")
    }

    /// Latest-starting meeting for a channel on a date.
    pub fn latest_for(
        conn: &Connection,
        channel_id: ChannelId,
        date: NaiveDate,
    ) -> Result<Option<Meeting>> {
        conn.query_row(
            &format!(
                "SELECT {MEETING_COLUMNS} FROM meetings \
                 WHERE channel_id = ?1 AND meeting_date = ?2 \
                 ORDER BY start_time DESC, id DESC LIMIT 1"
            ),
            params![channel_id as i64, date.format(DATE_FORMAT).to_string()],
            Meeting::from_row,
        )
        .optional()
        .context("Failed to query meeting for channel and date")
    }

    /// List meetings, newest first.
    pub fn list(conn: &Connection, limit: usize) -> Result<Vec<Meeting>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEETING_COLUMNS} FROM meetings \
                 ORDER BY meeting_date DESC, start_time DESC, id DESC LIMIT ?1"
            ))
            .context("Failed to prepare meetings list query")?;

        let meetings = stmt
            .query_map(params![limit as i64], Meeting::from_row)
            .context("Failed to list meetings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map meetings")?;

        Ok(meetings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use chrono::NaiveDateTime;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_insert_and_get_meeting() {
        let conn = setup_db();
        let id = MeetingRepository::insert(
            &conn,
            &NewMeeting::at(42, at(14, 9, 30), Some("Standup".to_string())),
        )
        .unwrap();
        assert!(id > 0);

        let meeting = MeetingRepository::get(&conn, id).unwrap().unwrap();
        assert_eq!(meeting.id, id);
        assert_eq!(meeting.channel_id, 42);
        assert_eq!(meeting.starts_at(), at(14, 9, 30));
        assert_eq!(meeting.description, Some("Standup".to_string()));
    }

    #[test]
    fn test_get_nonexistent_meeting() {
        let conn = setup_db();
        assert!(MeetingRepository::get(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn test_latest_for_picks_latest_start_on_date() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, &NewMeeting::at(42, at(14, 9, 0), None)).unwrap();
        let late = MeetingRepository::insert(&conn, &NewMeeting::at(42, at(14, 18, 0), None))
            .unwrap();
        MeetingRepository::insert(&conn, &NewMeeting::at(42, at(14, 12, 0), None)).unwrap();
        // Other channel and other day must not leak in
        MeetingRepository::insert(&conn, &NewMeeting::at(7, at(14, 23, 0), None)).unwrap();
        MeetingRepository::insert(&conn, &NewMeeting::at(42, at(15, 8, 0), None)).unwrap();

        let meeting = MeetingRepository::latest_for(&conn, 42, at(14, 0, 0).date())
            .unwrap()
            .unwrap();
        assert_eq!(meeting.id, late);
    }

    #[test]
    fn test_latest_for_absent() {
        let conn = setup_db();
        let result = MeetingRepository::latest_for(&conn, 42, at(14, 0, 0).date()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_orders_by_date_then_time_descending() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, &NewMeeting::at(1, at(13, 20, 0), None)).unwrap();
        MeetingRepository::insert(&conn, &NewMeeting::at(1, at(15, 8, 0), None)).unwrap();
        MeetingRepository::insert(&conn, &NewMeeting::at(1, at(15, 17, 0), None)).unwrap();

        let meetings = MeetingRepository::list(&conn, 2).unwrap();
        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].starts_at(), at(15, 17, 0));
        assert_eq!(meetings[1].starts_at(), at(15, 8, 0));
    }

    #[test]
    fn test_list_empty() {
        let conn = setup_db();
        assert!(MeetingRepository::list(&conn, 10).unwrap().is_empty());
    }
}
