pub mod attendance;
pub mod daily_record;
pub mod geo;
pub mod incident;
pub mod mutation;
pub mod notification;
pub mod punch_kind;
pub mod user;

pub use attendance::{AttendanceEvent, Condition, Method};
pub use daily_record::{AttendanceStats, DailyAttendanceRecord};
pub use punch_kind::PunchKind;
