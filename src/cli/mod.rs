//! CLI handlers. Every command talks to the running service over its HTTP API.

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde_json::json;

use crate::config::Config;
use crate::tracker::{CommandReply, JoinEvent};

pub mod args;

pub use args::{Cli, CliCommand, JoinCliArgs};

const CONNECT_ERROR: &str = "Failed to connect to rollcall service. Is it running?";

pub async fn handle_cli_command(command: CliCommand, config: &Config) -> Result<()> {
    let client = ServiceClient::new(config);

    match command {
        CliCommand::Version => {
            println!("rollcall {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Schedule {
            minutes,
            description,
        } => {
            let body = json!({
                "minutes": minutes,
                "description": joined(description),
            });
            client.post("/meetings/schedule", &body).await
        }
        CliCommand::Cancel => client.post("/meetings/cancel", &json!({})).await,
        CliCommand::Start { description } => {
            let body = json!({ "description": joined(description) });
            client.post("/meetings/start", &body).await
        }
        CliCommand::Report { date } => {
            let query: Vec<(&str, String)> = date.into_iter().map(|d| ("date", d)).collect();
            client.get("/meetings/report", &query).await
        }
        CliCommand::Meetings { limit } => {
            client
                .get("/meetings", &[("limit", limit.to_string())])
                .await
        }
        CliCommand::Join(args) => {
            let event = JoinEvent {
                member_id: args.member,
                display_name: args.name,
                channel_id: args
                    .channel
                    .unwrap_or(config.channels.monitored_channel_id),
                joined_at: args.at.unwrap_or_else(|| Local::now().naive_local()),
                is_bot: args.bot,
            };
            client.send_join(&event).await
        }
    }
}

fn joined(words: Vec<String>) -> Option<String> {
    let text = words.join(" ");
    (!text.trim().is_empty()).then_some(text)
}

struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.service_url(),
        }
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .context(CONNECT_ERROR)?;

        print_reply(response).await
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .context(CONNECT_ERROR)?;

        print_reply(response).await
    }

    async fn send_join(&self, event: &JoinEvent) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/events/join", self.base_url))
            .json(event)
            .send()
            .await
            .context(CONNECT_ERROR)?;

        if !response.status().is_success() {
            bail!("Join event rejected: HTTP {}", response.status());
        }

        println!(
            "Join of {} on channel {} sent",
            event.display_name, event.channel_id
        );
        Ok(())
    }
}

async fn print_reply(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let reply: CommandReply = response
        .json()
        .await
        .with_context(|| format!("Unexpected response from service (HTTP {status})"))?;

    if !reply.success {
        bail!("{}", reply.message);
    }

    println!("{}", reply.message);
    Ok(())
}
