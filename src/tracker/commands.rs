//! Front-end commands: parsing chat text and executing against the tracker.
//!
//! Every command yields a [`CommandReply`] with a human-readable message;
//! errors never escape to the caller.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::calculator::LatenessPolicy;
use super::error::{Result, TrackerError};
use super::lifecycle::MeetingLifecycle;
use super::notify::{announce, Notifier};
use super::report::{render_meeting_list, ReportBuilder};
use super::scheduler::start_notice;
use crate::db::{ChannelId, DATE_FORMAT};

pub const DEFAULT_MEETING_LIST_LIMIT: usize = 10;
/// Schedules further out than a week are rejected.
pub const MAX_SCHEDULE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Schedule {
        minutes: i64,
        description: Option<String>,
    },
    Cancel,
    Start {
        description: Option<String>,
    },
    /// Defaults to today when no date is given.
    Report {
        date: Option<NaiveDate>,
    },
    ListMeetings {
        limit: usize,
    },
}

/// Parse a chat message such as `!schedule 5 Weekly sync`.
///
/// Returns `Ok(None)` for text that does not carry the prefix.
pub fn parse_command(prefix: &str, text: &str) -> Result<Option<Command>> {
    let Some(body) = text.trim().strip_prefix(prefix) else {
        return Ok(None);
    };

    let body = body.trim_start();
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "schedule" => {
            let (minutes, description) = match rest.split_once(char::is_whitespace) {
                Some((minutes, description)) => (minutes, description),
                None => (rest, ""),
            };
            Command::Schedule {
                minutes: parse_minutes(minutes)?,
                description: non_empty(description),
            }
        }
        "cancelmeeting" | "cancel" => Command::Cancel,
        "startmeeting" | "start" => Command::Start {
            description: non_empty(rest),
        },
        "report" => Command::Report {
            date: match rest.split_whitespace().next() {
                Some(raw) => Some(parse_date(raw)?),
                None => None,
            },
        },
        "meetings" => Command::ListMeetings {
            limit: match rest.split_whitespace().next() {
                Some(raw) => raw.parse().map_err(|_| {
                    TrackerError::validation(format!("Invalid meeting count '{raw}'"))
                })?,
                None => DEFAULT_MEETING_LIST_LIMIT,
            },
        },
        other => {
            return Err(TrackerError::validation(format!(
                "Unknown command '{other}'"
            )))
        }
    };

    Ok(Some(command))
}

pub fn parse_minutes(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| minutes_error())
        .and_then(validate_minutes)
}

fn validate_minutes(minutes: i64) -> Result<i64> {
    if (1..=MAX_SCHEDULE_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(minutes_error())
    }
}

fn minutes_error() -> TrackerError {
    TrackerError::validation(format!(
        "Please provide a positive number of minutes, at most {MAX_SCHEDULE_MINUTES} (e.g. `schedule 6`)"
    ))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        TrackerError::validation(format!("Invalid date '{raw}', expected YYYY-MM-DD"))
    })
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    pub message: String,
}

impl CommandReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn from_error(err: &TrackerError) -> Self {
        Self::failed(err.to_string())
    }
}

/// Executes commands for the monitored channel and announces the results.
pub struct CommandDesk {
    reports: ReportBuilder,
    notifier: Arc<dyn Notifier>,
    policy: LatenessPolicy,
    monitored_channel: ChannelId,
    announcement_channel: ChannelId,
}

impl CommandDesk {
    pub fn new(
        reports: ReportBuilder,
        notifier: Arc<dyn Notifier>,
        policy: LatenessPolicy,
        monitored_channel: ChannelId,
        announcement_channel: ChannelId,
    ) -> Self {
        Self {
            reports,
            notifier,
            policy,
            monitored_channel,
            announcement_channel,
        }
    }

    pub async fn execute(
        &self,
        lifecycle: &mut MeetingLifecycle,
        command: Command,
        now: NaiveDateTime,
    ) -> CommandReply {
        info!("Executing command: {:?}", command);

        let result = match command {
            Command::Schedule {
                minutes,
                description,
            } => self.schedule(lifecycle, minutes, description, now).await,
            Command::Cancel => self.cancel(lifecycle).await,
            Command::Start { description } => self.start(lifecycle, description, now).await,
            Command::Report { date } => {
                let date = date.unwrap_or_else(|| now.date());
                self.reports
                    .report_for(self.monitored_channel, date)
                    .await
                    .map(|report| CommandReply::ok(report.render()))
            }
            Command::ListMeetings { limit } => self
                .reports
                .list_meetings(limit)
                .await
                .map(|meetings| CommandReply::ok(render_meeting_list(&meetings))),
        };

        result.unwrap_or_else(|e| {
            match &e {
                TrackerError::Persistence(_) => error!("Command failed: {}", e),
                _ => warn!("Command rejected: {}", e),
            }
            CommandReply::from_error(&e)
        })
    }

    async fn schedule(
        &self,
        lifecycle: &mut MeetingLifecycle,
        minutes: i64,
        description: Option<String>,
        now: NaiveDateTime,
    ) -> Result<CommandReply> {
        let minutes = validate_minutes(minutes)?;
        let starts_at = now + Duration::minutes(minutes);
        let notice = format!(
            "New meeting scheduled to start in {} minutes ({})\n{}",
            minutes,
            starts_at.format("%H:%M"),
            description.as_deref().unwrap_or("No description provided"),
        );

        lifecycle
            .schedule(self.monitored_channel, starts_at, description)
            .await?;

        let reply = format!("Meeting scheduled to start in {minutes} minutes");
        Ok(self
            .announce_or_warn(reply, &notice, "Scheduled the meeting")
            .await)
    }

    async fn cancel(&self, lifecycle: &mut MeetingLifecycle) -> Result<CommandReply> {
        let pending = lifecycle.cancel(self.monitored_channel)?;
        let time = pending.starts_at.format("%H:%M");

        let reply = format!("Scheduled meeting for {time} has been cancelled");
        let notice = format!("The meeting scheduled for {time} has been cancelled");
        Ok(self
            .announce_or_warn(reply, &notice, "Cancelled the meeting")
            .await)
    }

    async fn start(
        &self,
        lifecycle: &mut MeetingLifecycle,
        description: Option<String>,
        now: NaiveDateTime,
    ) -> Result<CommandReply> {
        let notice = start_notice(now, description.as_deref(), &self.policy);
        lifecycle
            .start_immediately(self.monitored_channel, description, now)
            .await?;

        Ok(self
            .announce_or_warn(
                "Meeting started. Punctuality tracking is active.".to_string(),
                &notice,
                "Started the meeting",
            )
            .await)
    }

    async fn announce_or_warn(&self, reply: String, notice: &str, done: &str) -> CommandReply {
        if announce(self.notifier.as_ref(), self.announcement_channel, notice).await {
            CommandReply::ok(reply)
        } else {
            CommandReply::ok(format!(
                "{reply}\n{done} but couldn't send the announcement to the channel"
            ))
        }
    }
}
