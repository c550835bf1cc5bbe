pub mod attendance_record;
pub mod attendance_session;
pub mod enrollment;
pub mod error;
pub mod roster_publisher;
pub mod scheduler;
pub mod service;

pub use error::AttendanceError;
