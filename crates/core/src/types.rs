/// Job identifiers are opaque hex tokens (a v4 UUID in simple form).
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A JSON document kept exactly as it was received: key order, number
/// precision and spacing inside the value are untouched.
pub type RawJson = Box<serde_json::value::RawValue>;

/// Generate a fresh job identifier.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4().simple().to_string()
}
