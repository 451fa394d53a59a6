//! Chat gateway events.
//!
//! The gateway posts a join event whenever a member enters a voice channel.
//! Events are queued for the service loop and acknowledged with 202.

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::app::ServiceEvent;
use crate::tracker::JoinEvent;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/events/join", post(member_joined))
        .with_state(state)
}

async fn member_joined(
    State(state): State<ApiState>,
    Json(event): Json<JoinEvent>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    debug!(
        "Join event for {} on channel {}",
        event.display_name, event.channel_id
    );

    state.tx.send(ServiceEvent::Join(event)).await.map_err(|e| {
        error!("Failed to queue join event: {}", e);
        ApiError::unavailable("Service is shutting down")
    })?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
