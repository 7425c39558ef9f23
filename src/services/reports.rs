use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::{classrooms, enrollments, leave_requests};
use crate::error::AppError;
use crate::models::{DateRange, User};

/// One roster row of the attendance report. Enrolled students without any
/// requests in the window appear with all-zero counts.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRow {
    pub student_id: String,
    pub email: String,
    pub full_name: String,
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
    pub pending: i64,
}

pub struct ReportService {
    db: SqlitePool,
}

impl ReportService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn attendance(
        &self,
        instructor: &User,
        classroom_id: &str,
        range: DateRange,
    ) -> Result<Vec<AttendanceRow>, AppError> {
        let classroom = classrooms::find_by_id(&self.db, classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;
        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you are not the instructor of this class".to_string(),
            ));
        }

        let roster = enrollments::roster(&self.db, classroom_id).await?;
        let counts: HashMap<String, leave_requests::StatusCounts> =
            leave_requests::count_by_student_in_range(&self.db, classroom_id, range)
                .await?
                .into_iter()
                .map(|c| (c.student_id.clone(), c))
                .collect();

        let rows = roster
            .into_iter()
            .map(|entry| {
                let (total, approved, rejected) = counts
                    .get(&entry.student_id)
                    .map(|c| (c.total, c.approved, c.rejected))
                    .unwrap_or((0, 0, 0));
                AttendanceRow {
                    student_id: entry.student_id,
                    email: entry.email,
                    full_name: entry.full_name,
                    total,
                    approved,
                    rejected,
                    pending: total - approved - rejected,
                }
            })
            .collect();
        Ok(rows)
    }
}
