//! Punctuality reports and meeting listings.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use super::error::{Result, TrackerError};
use crate::db::{AttendanceRecord, ChannelId, Meeting, PunctualityStore, DATE_FORMAT, TIME_FORMAT};

const DEFAULT_DESCRIPTION: &str = "Regular Meeting";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeetingReport {
    /// No meeting was held on the channel that day.
    NoMeeting { date: NaiveDate },
    Attendance {
        meeting: Meeting,
        /// Latest arrivals first.
        rows: Vec<AttendanceRecord>,
        total_fees: f64,
    },
}

impl MeetingReport {
    pub fn render(&self) -> String {
        match self {
            Self::NoMeeting { date } => {
                format!("No meetings found for {}", date.format(DATE_FORMAT))
            }
            Self::Attendance { meeting, rows, .. } if rows.is_empty() => format!(
                "No punctuality records found for meeting on {}",
                meeting.date.format(DATE_FORMAT)
            ),
            Self::Attendance {
                meeting,
                rows,
                total_fees,
            } => {
                let mut out = format!(
                    "Punctuality Report - {} {}\nMeeting: {}\n\n",
                    meeting.date.format(DATE_FORMAT),
                    meeting.start_time.format(TIME_FORMAT),
                    meeting.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
                );
                out.push_str("| Name | Join Time | Late (min) | Fee |\n");
                out.push_str("|------|-----------|------------|-----|\n");
                for row in rows {
                    let status = if row.late_minutes > 0 { "LATE" } else { "ON TIME" };
                    let _ = writeln!(
                        out,
                        "| {} | {} | {} {} | {:.2} |",
                        row.member_name,
                        row.arrived_at.format(TIME_FORMAT),
                        row.late_minutes,
                        status,
                        row.fee_amount,
                    );
                }
                let _ = write!(out, "\nTotal Fees: {total_fees:.2}");
                out
            }
        }
    }
}

pub fn render_meeting_list(meetings: &[Meeting]) -> String {
    if meetings.is_empty() {
        return "No meetings found in the database.".to_string();
    }

    let mut out = String::from("Recent Meetings\n\n");
    out.push_str("| Date | Time | Description |\n");
    out.push_str("|------|------|-------------|\n");
    for meeting in meetings {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            meeting.date.format(DATE_FORMAT),
            meeting.start_time.format(TIME_FORMAT),
            meeting.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
        );
    }
    out.push_str("\nUse the report command with a YYYY-MM-DD date for a specific meeting.");
    out
}

pub struct ReportBuilder {
    store: Arc<dyn PunctualityStore>,
}

impl ReportBuilder {
    pub fn new(store: Arc<dyn PunctualityStore>) -> Self {
        Self { store }
    }

    pub async fn report_for(&self, channel: ChannelId, date: NaiveDate) -> Result<MeetingReport> {
        let Some(meeting) = self
            .store
            .active_meeting(channel, date)
            .await
            .map_err(TrackerError::persistence)?
        else {
            debug!("No meeting for channel {} on {}", channel, date);
            return Ok(MeetingReport::NoMeeting { date });
        };

        let rows = self
            .store
            .attendance_report(meeting.id)
            .await
            .map_err(TrackerError::persistence)?;
        let total_fees = rows.iter().map(|row| row.fee_amount).sum();

        Ok(MeetingReport::Attendance {
            meeting,
            rows,
            total_fees,
        })
    }

    /// Most recent meetings first.
    pub async fn list_meetings(&self, limit: usize) -> Result<Vec<Meeting>> {
        self.store
            .list_meetings(limit)
            .await
            .map_err(TrackerError::persistence)
    }
}
