use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::models::{DateRange, LeaveRequest, LeaveStatus};

const COLUMNS: &str = "id, student_id, classroom_id, absence_date, reason, evidence, \
                       evidence_filename, evidence_content_type, status, approved_by, \
                       approved_at, denial_reason, created_at";

pub async fn insert<'e>(
    db: impl SqliteExecutor<'e>,
    request: &LeaveRequest,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO leave_requests \
         (id, student_id, classroom_id, absence_date, reason, evidence, evidence_filename, \
          evidence_content_type, status, approved_by, approved_at, denial_reason, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&request.id)
    .bind(&request.student_id)
    .bind(&request.classroom_id)
    .bind(request.absence_date)
    .bind(&request.reason)
    .bind(&request.evidence)
    .bind(&request.evidence_filename)
    .bind(&request.evidence_content_type)
    .bind(request.status)
    .bind(&request.approved_by)
    .bind(request.approved_at)
    .bind(&request.denial_reason)
    .bind(request.created_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {COLUMNS} FROM leave_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn delete<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Records an approve/deny decision. The status guard lives in the service;
/// this only writes the decision fields in one statement.
pub async fn record_decision<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    status: LeaveStatus,
    approved_by: &str,
    approved_at: DateTime<Utc>,
    denial_reason: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE leave_requests \
         SET status = ?, approved_by = ?, approved_at = ?, denial_reason = ? WHERE id = ?",
    )
    .bind(status)
    .bind(approved_by)
    .bind(approved_at)
    .bind(denial_reason)
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn exists_for_classroom<'e>(
    db: impl SqliteExecutor<'e>,
    classroom_id: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM leave_requests WHERE classroom_id = ?")
            .bind(classroom_id)
            .fetch_one(db)
            .await?;
    Ok(count > 0)
}

pub async fn exists_for_student_in_classroom<'e>(
    db: impl SqliteExecutor<'e>,
    student_id: &str,
    classroom_id: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM leave_requests WHERE student_id = ? AND classroom_id = ?",
    )
    .bind(student_id)
    .bind(classroom_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn list_by_student<'e>(
    db: impl SqliteExecutor<'e>,
    student_id: &str,
    range: Option<DateRange>,
) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    match range {
        Some(r) => {
            sqlx::query_as::<_, LeaveRequest>(&format!(
                "SELECT {COLUMNS} FROM leave_requests \
                 WHERE student_id = ? AND absence_date >= ? AND absence_date <= ? \
                 ORDER BY created_at DESC"
            ))
            .bind(student_id)
            .bind(r.start)
            .bind(r.end)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, LeaveRequest>(&format!(
                "SELECT {COLUMNS} FROM leave_requests WHERE student_id = ? \
                 ORDER BY created_at DESC"
            ))
            .bind(student_id)
            .fetch_all(db)
            .await
        }
    }
}

pub async fn list_for_classroom_by_status<'e>(
    db: impl SqliteExecutor<'e>,
    classroom_id: &str,
    status: LeaveStatus,
    range: Option<DateRange>,
) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    match range {
        Some(r) => {
            sqlx::query_as::<_, LeaveRequest>(&format!(
                "SELECT {COLUMNS} FROM leave_requests \
                 WHERE classroom_id = ? AND status = ? \
                 AND absence_date >= ? AND absence_date <= ? \
                 ORDER BY created_at DESC"
            ))
            .bind(classroom_id)
            .bind(status)
            .bind(r.start)
            .bind(r.end)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, LeaveRequest>(&format!(
                "SELECT {COLUMNS} FROM leave_requests WHERE classroom_id = ? AND status = ? \
                 ORDER BY created_at DESC"
            ))
            .bind(classroom_id)
            .bind(status)
            .fetch_all(db)
            .await
        }
    }
}

pub async fn list_for_classroom<'e>(
    db: impl SqliteExecutor<'e>,
    classroom_id: &str,
) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {COLUMNS} FROM leave_requests WHERE classroom_id = ? ORDER BY created_at DESC"
    ))
    .bind(classroom_id)
    .fetch_all(db)
    .await
}

pub async fn list_for_instructor<'e>(
    db: impl SqliteExecutor<'e>,
    instructor_id: &str,
) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT r.{} FROM leave_requests r \
         JOIN classrooms c ON c.id = r.classroom_id \
         WHERE c.instructor_id = ? ORDER BY r.created_at DESC",
        COLUMNS.replace(", ", ", r.")
    ))
    .bind(instructor_id)
    .fetch_all(db)
    .await
}

/// Per-student decision counts for requests whose absence date falls inside
/// the inclusive window. Students without requests simply do not appear;
/// the report service left-joins against the roster.
#[derive(Debug, sqlx::FromRow)]
pub struct StatusCounts {
    pub student_id: String,
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
}

pub async fn count_by_student_in_range<'e>(
    db: impl SqliteExecutor<'e>,
    classroom_id: &str,
    range: DateRange,
) -> Result<Vec<StatusCounts>, sqlx::Error> {
    sqlx::query_as::<_, StatusCounts>(
        "SELECT student_id, \
                COUNT(*) AS total, \
                SUM(CASE WHEN status = 'APPROVED' THEN 1 ELSE 0 END) AS approved, \
                SUM(CASE WHEN status = 'REJECTED' THEN 1 ELSE 0 END) AS rejected \
         FROM leave_requests \
         WHERE classroom_id = ? AND absence_date >= ? AND absence_date <= ? \
         GROUP BY student_id",
    )
    .bind(classroom_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(db)
    .await
}
