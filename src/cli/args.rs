use chrono::NaiveDateTime;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "Meeting punctuality tracker", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.config/rollcall/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Schedule a meeting some minutes from now
    Schedule {
        /// Minutes until the meeting starts
        minutes: i64,
        /// Optional description
        description: Vec<String>,
    },
    /// Cancel the scheduled meeting
    Cancel,
    /// Start a meeting right now
    Start {
        /// Optional description
        description: Vec<String>,
    },
    /// Show the punctuality report for a day
    Report {
        /// Date in YYYY-MM-DD format (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List recent meetings
    Meetings {
        /// Maximum number of meetings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Send a member join event, as the chat gateway would
    Join(JoinCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct JoinCliArgs {
    /// Member identifier on the chat platform
    #[arg(long)]
    pub member: u64,
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Channel joined (default: the monitored channel)
    #[arg(long)]
    pub channel: Option<u64>,
    /// Join time as YYYY-MM-DDTHH:MM:SS (default: now)
    #[arg(long)]
    pub at: Option<NaiveDateTime>,
    /// Mark the member as an automated account
    #[arg(long)]
    pub bot: bool,
}
