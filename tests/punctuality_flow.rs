//! End-to-end tests through the service event loop.
//!
//! Drives the same `PunctualityService` the binary runs, backed by an
//! on-disk SQLite file in a temp directory.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rollcall::app::{PunctualityService, ServiceEvent};
use rollcall::config::Config;
use rollcall::db::{ChannelId, PunctualityStore, SqliteStore};
use rollcall::tracker::{Command, CommandReply, JoinEvent, MeetingReport, Notifier, ReportBuilder};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

const VOICE: ChannelId = 11;
const TEXT: ChannelId = 22;

#[derive(Clone, Default)]
struct Outbox(Arc<Mutex<Vec<String>>>);

impl Outbox {
    fn texts(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn notify(&self, _channel: ChannelId, text: &str) -> rollcall::tracker::Result<()> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn created_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .unwrap()
        .and_hms_opt(18, 0, 0)
        .unwrap()
}

fn service(store: Arc<SqliteStore>, outbox: &Outbox) -> PunctualityService {
    let mut config = Config::default();
    config.channels.monitored_channel_id = VOICE;
    config.channels.announcement_channel_id = TEXT;
    config.punctuality.grace_period_minutes = 1;
    config.punctuality.fee_per_minute = 200.0;
    PunctualityService::new(&config, store, Arc::new(outbox.clone()))
}

async fn execute(
    service: &mut PunctualityService,
    command: Command,
    at: NaiveDateTime,
) -> CommandReply {
    let (reply, rx) = oneshot::channel();
    service
        .handle(ServiceEvent::Execute {
            command,
            received_at: at,
            reply,
        })
        .await;
    rx.await.unwrap()
}

fn join(member: u64, name: &str, at: NaiveDateTime) -> ServiceEvent {
    ServiceEvent::Join(JoinEvent {
        member_id: member,
        display_name: name.to_string(),
        channel_id: VOICE,
        joined_at: at,
        is_bot: false,
    })
}

#[tokio::test]
async fn test_scheduled_meeting_charges_late_arrival() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("attendance.db")).unwrap());
    let outbox = Outbox::default();
    let mut service = service(store.clone(), &outbox);
    let t0 = created_at();

    let reply = execute(
        &mut service,
        Command::Schedule {
            minutes: 5,
            description: Some("Weekly sync".to_string()),
        },
        t0,
    )
    .await;
    assert!(reply.success, "{}", reply.message);

    service.handle(ServiceEvent::Tick(t0 + Duration::minutes(1))).await;
    service.handle(ServiceEvent::Tick(t0 + Duration::minutes(5))).await;
    assert!(service.lifecycle().state().active(VOICE).is_some());
    assert!(service.lifecycle().state().pending(VOICE).is_none());

    service
        .handle(join(1, "ada", t0 + Duration::minutes(7)))
        .await;

    let report = ReportBuilder::new(store.clone())
        .report_for(VOICE, t0.date())
        .await
        .unwrap();
    let MeetingReport::Attendance {
        rows, total_fees, ..
    } = report
    else {
        panic!("expected an attendance report");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].late_minutes, 1);
    assert_eq!(rows[0].fee_amount, 200.0);
    assert_eq!(total_fees, 200.0);

    let texts = outbox.texts();
    assert!(texts[0].starts_with("New meeting scheduled to start in 5 minutes (18:05)"));
    assert!(texts[1].starts_with("REMINDER: Meeting starts in 4 minutes - Weekly sync"));
    assert!(texts[2].starts_with("MEETING STARTED at 18:05:00 - Weekly sync"));
    assert_eq!(texts[3], "ada joined 1 minute(s) late. Fee: 200.00");
}

#[tokio::test]
async fn test_repeated_join_is_charged_once() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let outbox = Outbox::default();
    let mut service = service(store.clone(), &outbox);
    let t0 = created_at();

    execute(&mut service, Command::Start { description: None }, t0).await;
    service.handle(join(2, "bo", t0 + Duration::minutes(4))).await;
    service.handle(join(2, "bo", t0 + Duration::minutes(9))).await;

    let meetings = store.list_meetings(10).await.unwrap();
    let records = store.attendance_report(meetings[0].id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].late_minutes, 3);
    assert_eq!(records[0].fee_amount, 600.0);
}

#[tokio::test]
async fn test_restart_keeps_single_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let t0 = created_at();

    let outbox = Outbox::default();
    let mut first = service(Arc::new(SqliteStore::open(&path).unwrap()), &outbox);
    execute(&mut first, Command::Start { description: None }, t0).await;
    first.handle(join(3, "cy", t0 + Duration::minutes(2))).await;
    drop(first);

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let mut second = service(store.clone(), &outbox);
    second.handle(join(3, "cy", t0 + Duration::minutes(20))).await;
    second.handle(join(4, "di", t0 + Duration::minutes(21))).await;

    let meetings = store.list_meetings(10).await.unwrap();
    assert_eq!(meetings.len(), 1);
    let records = store.attendance_report(meetings[0].id).await.unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.member_name.as_str()).collect();
    assert_eq!(names, vec!["di", "cy"]);
    assert_eq!(records[1].late_minutes, 1);
}

#[tokio::test]
async fn test_report_for_day_without_meeting() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let outbox = Outbox::default();
    let mut service = service(store, &outbox);

    let reply = execute(
        &mut service,
        Command::Report {
            date: NaiveDate::from_ymd_opt(2025, 6, 1),
        },
        created_at(),
    )
    .await;

    assert!(reply.success);
    assert_eq!(reply.message, "No meetings found for 2025-06-01");
}
