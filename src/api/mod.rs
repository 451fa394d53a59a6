//! REST API server for rollcall.
//!
//! Provides HTTP endpoints for:
//! - Member join events from the chat gateway
//! - Scheduling, cancelling and starting meetings
//! - Punctuality reports and the meeting list
//! - Raw chat text commands

pub mod error;
pub mod routes;

use crate::app::ServiceEvent;
use crate::config::Config;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tracing::info;

/// Handle shared by every route: events go to the service loop.
#[derive(Clone)]
pub struct ApiState {
    pub tx: mpsc::Sender<ServiceEvent>,
    pub command_prefix: String,
}

pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(tx: mpsc::Sender<ServiceEvent>, config: &Config) -> Self {
        Self {
            port: config.api.port,
            state: ApiState {
                tx,
                command_prefix: config.api.command_prefix.clone(),
            },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                   - Service info");
        info!("  GET  /version            - Get version info");
        info!("  POST /events/join        - Report a member joining a channel");
        info!("  POST /meetings/schedule  - Schedule a meeting");
        info!("  POST /meetings/cancel    - Cancel the scheduled meeting");
        info!("  POST /meetings/start     - Start a meeting now");
        info!("  GET  /meetings           - List recent meetings");
        info!("  GET  /meetings/report    - Punctuality report for a date");
        info!("  POST /commands           - Run a chat text command");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/version", get(version))
        .merge(routes::events::router(state.clone()))
        .merge(routes::meetings::router(state))
        .layer(ServiceBuilder::new())
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "rollcall",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "rollcall"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_reports_service() {
        let (tx, _rx) = mpsc::channel(1);
        let app = router(ApiState {
            tx,
            command_prefix: "!".to_string(),
        });

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["service"], "rollcall");
    }
}
