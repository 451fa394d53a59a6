//! SQLite persistence for meetings and attendance records.
//!
//! Raw SQL with rusqlite, no ORM. The tracker only talks to the
//! [`PunctualityStore`] trait; the repositories are the synchronous layer
//! underneath it.

pub mod attendance;
mod init;
pub mod meetings;
pub mod schemas;
pub mod store;


pub use attendance::AttendanceRepository;
pub use init::{migrate, open_db};
pub use meetings::MeetingRepository;
pub use schemas::{
    AttendanceRecord, ChannelId, Meeting, MeetingId, MemberId, NewAttendance, NewMeeting,
    RecordId, Recorded, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT,
};
pub use store::{PunctualityStore, SqliteStore};
