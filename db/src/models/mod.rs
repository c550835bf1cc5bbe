pub mod attendance_record;
pub mod enrollment;
pub mod realtime_document;
pub mod session;

pub use attendance_record::{AttendanceRecord, AttendanceStatus};
pub use enrollment::EnrolledStudent;
pub use session::{Session, SessionKey, SessionKeyError};
