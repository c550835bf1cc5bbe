use db::models::SessionKey;

pub const ROSTER_EVENT: &str = "session.roster";
pub const LOCK_STATUS_EVENT: &str = "session.lock_status";

pub fn roster_topic(key: &SessionKey) -> String {
    format!("sessions:{key}:roster")
}

pub fn lock_status_topic(key: &SessionKey) -> String {
    format!("sessions:{key}:lock")
}
