use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};

/// Attendance outcome for one student in one session.
///
/// Stored as its upper-case name. Anything that does not parse back decodes
/// as [`AttendanceStatus::Absent`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn decode(raw: &str) -> Self {
        raw.parse().unwrap_or(AttendanceStatus::Absent)
    }
}

/// Field names of a roster entry under `sessions/{key}/students/{studentId}`.
pub mod fields {
    pub const STUDENT_ID: &str = "studentId";
    /// Older entries carried the id under this name instead.
    pub const STUDENT_UID: &str = "studentUid";
    pub const STUDENT_NAME: &str = "studentName";
    pub const MATRIC_NUMBER: &str = "matricNumber";
    pub const EMAIL: &str = "email";
    pub const STATUS: &str = "status";
    pub const CHECK_IN_TIME: &str = "checkInTime";
    pub const TIMESTAMP: &str = "timestamp";
    pub const AUTO_MARKED: &str = "autoMarked";
    pub const MARKED_AT: &str = "markedAt";
    pub const MANUALLY_MARKED: &str = "manuallyMarked";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub student_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matric_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: AttendanceStatus,
    /// ISO-8601; absent on auto-marked absences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<String>,
    /// Epoch milliseconds of the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_marked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manually_marked: Option<bool>,
}

impl AttendanceRecord {
    /// Decode a roster entry stored under `key`.
    ///
    /// The id falls back from `studentId` (string or number) to `studentUid`
    /// to the node key; a missing name is empty; an unknown status is ABSENT.
    /// Returns `None` only when the entry is not an object.
    pub fn from_entry(key: &str, value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let student_id = id_field(obj, fields::STUDENT_ID)
            .or_else(|| id_field(obj, fields::STUDENT_UID))
            .unwrap_or_else(|| key.to_string());
        let status = obj
            .get(fields::STATUS)
            .and_then(Value::as_str)
            .map(AttendanceStatus::decode)
            .unwrap_or(AttendanceStatus::Absent);

        Some(Self {
            student_id,
            student_name: str_field(obj, fields::STUDENT_NAME).unwrap_or_default(),
            matric_number: str_field(obj, fields::MATRIC_NUMBER),
            email: str_field(obj, fields::EMAIL),
            status,
            check_in_time: str_field(obj, fields::CHECK_IN_TIME),
            timestamp: obj.get(fields::TIMESTAMP).and_then(as_millis),
            auto_marked: obj.get(fields::AUTO_MARKED).and_then(Value::as_bool),
            marked_at: obj.get(fields::MARKED_AT).and_then(as_millis),
            manually_marked: obj.get(fields::MANUALLY_MARKED).and_then(Value::as_bool),
        })
    }

    pub fn to_value(&self) -> Value {
        // Plain data struct; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn has_attended(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

fn str_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(str::to_string)
}

fn id_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    match obj.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Epoch-millisecond field; tolerates floats written by other clients.
pub fn as_millis(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// Decode a whole roster node, skipping entries that are not objects.
pub fn parse_roster(roster: Option<&Value>) -> Vec<AttendanceRecord> {
    let Some(Value::Object(entries)) = roster else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|(key, entry)| {
            let parsed = AttendanceRecord::from_entry(key, entry);
            if parsed.is_none() {
                tracing::warn!("Skipping malformed roster entry '{key}'");
            }
            parsed
        })
        .collect()
}
