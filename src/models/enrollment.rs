use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub classroom_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Roster entry returned to instructors: enrollment joined with the
/// student's public identity.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RosterEntry {
    pub enrollment_id: String,
    pub student_id: String,
    pub email: String,
    pub full_name: String,
    pub joined_at: DateTime<Utc>,
}
