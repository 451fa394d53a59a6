//! Per-user locations of the config file and the attendance database.
//!
//! `ROLLCALL_CONFIG_DIR` and `ROLLCALL_DATA_DIR` take precedence over the
//! platform directories.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "rollcall";
const CONFIG_DIR_ENV: &str = "ROLLCALL_CONFIG_DIR";
const DATA_DIR_ENV: &str = "ROLLCALL_DATA_DIR";

pub fn config_dir() -> Result<PathBuf> {
    resolve_dir(env_dir(CONFIG_DIR_ENV), dirs::config_dir(), None)
        .context("Unable to determine config directory")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn data_dir() -> Result<PathBuf> {
    let fallback = dirs::home_dir().map(|home| home.join(".local").join("share"));
    resolve_dir(env_dir(DATA_DIR_ENV), dirs::data_dir(), fallback)
        .context("Unable to determine data directory")
}

pub fn db_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("attendance.db"))
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// An explicit directory is used as is; platform and fallback bases get the
/// app directory appended.
fn resolve_dir(
    explicit: Option<PathBuf>,
    platform: Option<PathBuf>,
    fallback: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit.or_else(|| platform.or(fallback).map(|base| base.join(APP_DIR)))
}
