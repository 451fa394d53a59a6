use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub fn open_db(db_path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS meetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            channel_id INTEGER NOT NULL,
            description TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meetings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meetings_channel_date ON meetings(channel_id, meeting_date)",
        [],
    )
    .context("Failed to create meetings channel/date index")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id INTEGER NOT NULL REFERENCES meetings(id),
            member_id INTEGER NOT NULL,
            member_name TEXT NOT NULL,
            arrived_at TEXT NOT NULL,
            late_minutes INTEGER NOT NULL DEFAULT 0 CHECK (late_minutes >= 0),
            fee_amount REAL NOT NULL DEFAULT 0 CHECK (fee_amount >= 0),
            UNIQUE (meeting_id, member_id)
        )",
        [],
    )
    .context("Failed to create attendance table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_meeting ON attendance(meeting_id)",
        [],
    )
    .context("Failed to create attendance meeting index")?;

    Ok(())
}
