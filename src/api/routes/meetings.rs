//! Meeting command endpoints.
//!
//! Provides HTTP endpoints for:
//! - Scheduling a meeting (POST /meetings/schedule)
//! - Cancelling the scheduled meeting (POST /meetings/cancel)
//! - Starting a meeting now (POST /meetings/start)
//! - Listing recent meetings (GET /meetings)
//! - Punctuality report for a date (GET /meetings/report)
//! - Raw chat text commands (POST /commands)
//!
//! Every endpoint answers with `{ "success", "message" }`; a rejected
//! command is a 400.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::app::ServiceEvent;
use crate::tracker::commands::{parse_date, DEFAULT_MEETING_LIST_LIMIT};
use crate::tracker::{parse_command, Command, CommandReply};

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub minutes: i64,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// YYYY-MM-DD, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextCommandRequest {
    pub text: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/meetings", get(list_meetings))
        .route("/meetings/schedule", post(schedule_meeting))
        .route("/meetings/cancel", post(cancel_meeting))
        .route("/meetings/start", post(start_meeting))
        .route("/meetings/report", get(meeting_report))
        .route("/commands", post(text_command))
        .with_state(state)
}

async fn schedule_meeting(
    State(state): State<ApiState>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    dispatch(
        &state,
        Command::Schedule {
            minutes: req.minutes,
            description: req.description,
        },
    )
    .await
}

async fn cancel_meeting(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    dispatch(&state, Command::Cancel).await
}

async fn start_meeting(
    State(state): State<ApiState>,
    body: Option<Json<StartRequest>>,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    let description = body.and_then(|Json(req)| req.description);
    dispatch(&state, Command::Start { description }).await
}

async fn list_meetings(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    let limit = query.limit.unwrap_or(DEFAULT_MEETING_LIST_LIMIT);
    dispatch(&state, Command::ListMeetings { limit }).await
}

async fn meeting_report(
    State(state): State<ApiState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    let date = query.date.as_deref().map(parse_date).transpose()?;
    dispatch(&state, Command::Report { date }).await
}

async fn text_command(
    State(state): State<ApiState>,
    Json(req): Json<TextCommandRequest>,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    match parse_command(&state.command_prefix, &req.text)? {
        Some(command) => dispatch(&state, command).await,
        None => Err(ApiError::bad_request(format!(
            "Commands start with '{}'",
            state.command_prefix
        ))),
    }
}

/// Hand a command to the service loop and wait for its reply.
async fn dispatch(
    state: &ApiState,
    command: Command,
) -> ApiResult<(StatusCode, Json<CommandReply>)> {
    info!("Command received via API: {:?}", command);

    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .tx
        .send(ServiceEvent::Execute {
            command,
            received_at: Local::now().naive_local(),
            reply: reply_tx,
        })
        .await
        .map_err(|e| {
            error!("Failed to send command to service: {}", e);
            ApiError::unavailable("Service is shutting down")
        })?;

    let reply = reply_rx.await.map_err(|_| {
        error!("Service dropped the command without replying");
        ApiError::unavailable("Service did not answer")
    })?;

    let status = if reply.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(reply)))
}
