use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Leave request lifecycle states. Transitions are one-way:
/// Pending -> Approved or Pending -> Rejected, nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveRequest {
    pub id: String,
    pub student_id: String,
    pub classroom_id: String,
    pub absence_date: NaiveDate,
    pub reason: String,
    #[serde(skip_serializing)]
    pub evidence: Option<Vec<u8>>,
    pub evidence_filename: Option<String>,
    pub evidence_content_type: Option<String>,
    pub status: LeaveStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inclusive absence-date window. Both bounds are required; the API layer
/// rejects a single bound before one of these is ever constructed.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenyRequest {
    pub denial_reason: Option<String>,
}
