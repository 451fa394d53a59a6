use crate::api::ApiServer;
use crate::config::Config;
use crate::db::{PunctualityStore, SqliteStore};
use crate::tracker::{
    build_notifier, spawn_ticker, ArrivalHandler, ArrivalOutcome, Command, CommandDesk,
    CommandReply, JoinEvent, LatenessPolicy, MeetingLifecycle, Notifier, ReminderScheduler,
    ReportBuilder,
};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Everything the event loop reacts to. Join events and commands come from
/// the API, ticks from the scheduler ticker.
#[derive(Debug)]
pub enum ServiceEvent {
    Join(JoinEvent),
    Tick(NaiveDateTime),
    Execute {
        command: Command,
        received_at: NaiveDateTime,
        reply: oneshot::Sender<CommandReply>,
    },
}

/// Owns the lifecycle state. Only the event loop touches it.
pub struct PunctualityService {
    lifecycle: MeetingLifecycle,
    scheduler: ReminderScheduler,
    arrivals: ArrivalHandler,
    desk: CommandDesk,
}

impl PunctualityService {
    pub fn new(
        config: &Config,
        store: Arc<dyn PunctualityStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let policy = LatenessPolicy::from(&config.punctuality);
        let monitored = config.channels.monitored_channel_id;
        let announcements = config.channels.announcement_channel_id;

        Self {
            lifecycle: MeetingLifecycle::new(
                store.clone(),
                config.punctuality.reminder_threshold_minutes,
            ),
            scheduler: ReminderScheduler::new(notifier.clone(), announcements, policy),
            arrivals: ArrivalHandler::new(
                store.clone(),
                notifier.clone(),
                policy,
                monitored,
                announcements,
            ),
            desk: CommandDesk::new(
                ReportBuilder::new(store),
                notifier,
                policy,
                monitored,
                announcements,
            ),
        }
    }

    pub fn lifecycle(&self) -> &MeetingLifecycle {
        &self.lifecycle
    }

    pub async fn handle(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Join(join) => {
                match self.arrivals.handle(&mut self.lifecycle, &join).await {
                    ArrivalOutcome::Recorded { lateness, .. } => info!(
                        "Arrival of {} recorded ({} minute(s) late)",
                        join.display_name, lateness.late_minutes
                    ),
                    outcome => debug!("Join of {}: {:?}", join.display_name, outcome),
                }
            }
            ServiceEvent::Tick(now) => {
                let outcomes = self.scheduler.run_tick(&mut self.lifecycle, now).await;
                if !outcomes.is_empty() {
                    debug!("Tick at {} produced {} outcome(s)", now, outcomes.len());
                }
            }
            ServiceEvent::Execute {
                command,
                received_at,
                reply,
            } => {
                let result = self
                    .desk
                    .execute(&mut self.lifecycle, command, received_at)
                    .await;
                if reply.send(result).is_err() {
                    warn!("Command requester went away before the reply was sent");
                }
            }
        }
    }
}

pub async fn run_service(config: Config) -> Result<()> {
    info!("Starting rollcall service");

    config.validate()?;
    if config.channels.monitored_channel_id == 0 {
        warn!("channels.monitored_channel_id is not set, no arrivals will be tracked");
    }
    let db_path = config.database_path()?;
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?,
    );
    info!("Using database at {}", db_path.display());

    let notifier = build_notifier(&config.notifications)?;
    let mut service = PunctualityService::new(&config, store, notifier);

    let (tx, mut rx) = mpsc::channel::<ServiceEvent>(64);

    let ticker = spawn_ticker(
        Duration::from_secs(config.scheduler.tick_interval_seconds),
        tx.clone(),
        ServiceEvent::Tick,
    );

    let api_server = ApiServer::new(tx, &config);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!(
        "Tracking arrivals on channel {}, announcing to channel {}",
        config.channels.monitored_channel_id, config.channels.announcement_channel_id
    );
    info!("rollcall is ready!");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => service.handle(event).await,
                None => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    ticker.abort();
    info!("rollcall stopped");
    Ok(())
}
