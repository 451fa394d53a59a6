//! Tracker error taxonomy.

use thiserror::Error;

use crate::db::ChannelId;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Bad user-supplied input; never reaches persistence.
    #[error("{0}")]
    Validation(String),

    #[error("A meeting is already scheduled for channel {channel}. Cancel it first.")]
    AlreadyScheduled { channel: ChannelId },

    #[error("No meeting is currently scheduled for channel {channel}")]
    NothingScheduled { channel: ChannelId },

    #[error("Persistence failure: {0:#}")]
    Persistence(anyhow::Error),

    #[error("Notification failure: {0}")]
    Notification(String),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification(message.into())
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_persistence_message_includes_cause_chain() {
        let err = TrackerError::persistence(anyhow!("disk full").context("Failed to insert meeting"));
        let message = err.to_string();
        assert!(message.contains("Failed to insert meeting"));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn test_already_scheduled_names_channel() {
        let err = TrackerError::AlreadyScheduled { channel: 42 };
        assert!(err.to_string().contains("42"));
    }
}
