//! Attendance record persistence.
//!
//! One row per (meeting, member). Inserting a second row for the same pair
//! is a no-op that hands back the existing ID.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::schemas::{AttendanceRecord, MeetingId, NewAttendance, Recorded, DATETIME_FORMAT};

pub struct AttendanceRepository;

impl AttendanceRepository {
    pub fn record(conn: &Connection, attendance: &NewAttendance) -> Result<Recorded> {
        let inserted = conn
            .execute(
                "INSERT INTO attendance \
                 (meeting_id, member_id, member_name, arrived_at, late_minutes, fee_amount) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (meeting_id, member_id) DO NOTHING",
                params![
                    attendance.meeting_id,
                    attendance.member_id as i64,
                    attendance.member_name,
                    attendance.arrived_at.format(DATETIME_FORMAT).to_string(),
                    attendance.late_minutes,
                    attendance.fee_amount,
                ],
            )
            .context("Failed to insert attendance")?;

        if inserted > 0 {
            return Ok(Recorded::Created(conn.last_insert_rowid()));
        }

        let existing: i64 = conn
            .query_row(
                "SELECT id FROM attendance WHERE meeting_id = ?1 AND member_id = ?2",
                params![attendance.meeting_id, attendance.member_id as i64],
                |row| row.get(0),
            )
            .context("Failed to look up existing attendance")?;

        Ok(Recorded::Existing(existing))
    }

    /// Records for a meeting, latest arrivals (most late minutes) first.
    pub fn for_meeting(conn: &Connection, meeting_id: MeetingId) -> Result<Vec<AttendanceRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, meeting_id, member_id, member_name, arrived_at, late_minutes, fee_amount \
                 FROM attendance WHERE meeting_id = ?1 \
                 ORDER BY late_minutes DESC, id ASC",
            )
            .context("Failed to prepare attendance query")?;

        let records = stmt
            .query_map(params![meeting_id], AttendanceRecord::from_row)
            .context("Failed to query attendance")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map attendance")?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrate, MeetingRepository, NewMeeting};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup_db() -> (Connection, MeetingId) {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let meeting_id =
            MeetingRepository::insert(&conn, &NewMeeting::at(42, at(9, 0), None)).unwrap();
        (conn, meeting_id)
    }

    #[test]
    fn test_record_creates_once_per_member() {
        let (conn, meeting_id) = setup_db();
        let first = NewAttendance::new(meeting_id, 5, "Ada", at(9, 3), 2, 400.0).unwrap();
        let retry = NewAttendance::new(meeting_id, 5, "Ada", at(9, 20), 19, 3800.0).unwrap();

        let created = AttendanceRepository::record(&conn, &first).unwrap();
        let again = AttendanceRepository::record(&conn, &retry).unwrap();

        assert!(matches!(created, Recorded::Created(_)));
        assert_eq!(again, Recorded::Existing(created.id()));

        let records = AttendanceRepository::for_meeting(&conn, meeting_id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].late_minutes, 2);
        assert_eq!(records[0].fee_amount, 400.0);
    }

    #[test]
    fn test_same_member_in_different_meetings() {
        let (conn, first_meeting) = setup_db();
        let second_meeting =
            MeetingRepository::insert(&conn, &NewMeeting::at(42, at(18, 0), None)).unwrap();

        let a = NewAttendance::new(first_meeting, 5, "Ada", at(9, 0), 0, 0.0).unwrap();
        let b = NewAttendance::new(second_meeting, 5, "Ada", at(18, 0), 0, 0.0).unwrap();

        assert!(matches!(
            AttendanceRepository::record(&conn, &a).unwrap(),
            Recorded::Created(_)
        ));
        assert!(matches!(
            AttendanceRepository::record(&conn, &b).unwrap(),
            Recorded::Created(_)
        ));
    }

    #[test]
    fn test_for_meeting_orders_latest_first() {
        let (conn, meeting_id) = setup_db();
        for (member, late) in [(1_u64, 0_u32), (2, 7), (3, 3)] {
            let attendance = NewAttendance::new(
                meeting_id,
                member,
                format!("member-{member}"),
                at(9, late + 1),
                late,
                f64::from(late) * 200.0,
            )
            .unwrap();
            AttendanceRepository::record(&conn, &attendance).unwrap();
        }

        let records = AttendanceRepository::for_meeting(&conn, meeting_id).unwrap();
        let order: Vec<u32> = records.iter().map(|r| r.late_minutes).collect();
        assert_eq!(order, vec![7, 3, 0]);
        assert_eq!(records[0].member_name, "member-2");
        assert_eq!(records[0].arrived_at, at(9, 8));
    }

    #[test]
    fn test_record_rejects_unknown_meeting() {
        let (conn, _) = setup_db();
        let attendance = NewAttendance::new(9999, 5, "Ada", at(9, 0), 0, 0.0).unwrap();
        assert!(AttendanceRepository::record(&conn, &attendance).is_err());
    }
}
