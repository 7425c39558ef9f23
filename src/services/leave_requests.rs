use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::{classrooms, enrollments, leave_requests};
use crate::error::AppError;
use crate::evidence::EvidencePayload;
use crate::models::{DateRange, LeaveRequest, LeaveStatus, User};

pub struct LeaveRequestService {
    db: SqlitePool,
}

impl LeaveRequestService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn submit(
        &self,
        student: &User,
        classroom_id: &str,
        absence_date: NaiveDate,
        reason: String,
        evidence: Option<EvidencePayload>,
    ) -> Result<LeaveRequest, AppError> {
        let mut tx = self.db.begin().await?;

        classrooms::find_by_id(&mut *tx, classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;

        if !enrollments::exists(&mut *tx, &student.id, classroom_id).await? {
            return Err(AppError::Forbidden(
                "you are not enrolled in this class".to_string(),
            ));
        }

        if absence_date < Utc::now().date_naive() {
            return Err(AppError::Validation(
                "absence date must be today or in the future".to_string(),
            ));
        }

        let (evidence_bytes, evidence_filename, evidence_content_type) = match evidence {
            Some(payload) => (
                Some(payload.bytes),
                Some(payload.filename),
                Some(payload.content_type),
            ),
            None => (None, None, None),
        };

        let request = LeaveRequest {
            id: Uuid::new_v4().to_string(),
            student_id: student.id.clone(),
            classroom_id: classroom_id.to_string(),
            absence_date,
            reason,
            evidence: evidence_bytes,
            evidence_filename,
            evidence_content_type,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            denial_reason: None,
            created_at: Utc::now(),
        };
        leave_requests::insert(&mut *tx, &request).await?;
        tx.commit().await?;

        info!(request_id = %request.id, classroom_id = %classroom_id, "leave request submitted");
        Ok(request)
    }

    /// Students may withdraw their own request while it is still pending.
    pub async fn delete(&self, student: &User, request_id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let request = leave_requests::find_by_id(&mut *tx, request_id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?;

        if request.student_id != student.id {
            return Err(AppError::Forbidden("not your request".to_string()));
        }

        if request.status != LeaveStatus::Pending {
            return Err(AppError::Conflict("request already processed".to_string()));
        }

        leave_requests::delete(&mut *tx, request_id).await?;
        tx.commit().await?;

        info!(request_id = %request_id, "leave request withdrawn");
        Ok(())
    }

    pub async fn approve(
        &self,
        instructor: &User,
        request_id: &str,
    ) -> Result<LeaveRequest, AppError> {
        self.decide(instructor, request_id, LeaveStatus::Approved, None)
            .await
    }

    pub async fn deny(
        &self,
        instructor: &User,
        request_id: &str,
        denial_reason: Option<String>,
    ) -> Result<LeaveRequest, AppError> {
        let reason = denial_reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let reason =
            reason.ok_or_else(|| AppError::Validation("denial reason is required".to_string()))?;
        self.decide(instructor, request_id, LeaveStatus::Rejected, Some(reason))
            .await
    }

    /// One-way transition out of Pending. The status guard and the write
    /// share a transaction, so of two racing decisions one commits and the
    /// other observes "already processed".
    async fn decide(
        &self,
        instructor: &User,
        request_id: &str,
        status: LeaveStatus,
        denial_reason: Option<String>,
    ) -> Result<LeaveRequest, AppError> {
        let mut tx = self.db.begin().await?;

        let mut request = leave_requests::find_by_id(&mut *tx, request_id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?;

        let classroom = classrooms::find_by_id(&mut *tx, &request.classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;

        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you are not the instructor of this class".to_string(),
            ));
        }

        if request.status != LeaveStatus::Pending {
            return Err(AppError::Conflict("request already processed".to_string()));
        }

        let now = Utc::now();
        leave_requests::record_decision(
            &mut *tx,
            request_id,
            status,
            &instructor.id,
            now,
            denial_reason.as_deref(),
        )
        .await?;
        tx.commit().await?;

        request.status = status;
        request.approved_by = Some(instructor.id.clone());
        request.approved_at = Some(now);
        request.denial_reason = denial_reason;

        info!(request_id = %request_id, status = ?status, "leave request decided");
        Ok(request)
    }

    pub async fn get_for_student(
        &self,
        student: &User,
        request_id: &str,
    ) -> Result<LeaveRequest, AppError> {
        let request = leave_requests::find_by_id(&self.db, request_id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?;
        if request.student_id != student.id {
            return Err(AppError::Forbidden("not your request".to_string()));
        }
        Ok(request)
    }

    pub async fn get_for_instructor(
        &self,
        instructor: &User,
        request_id: &str,
    ) -> Result<LeaveRequest, AppError> {
        let request = leave_requests::find_by_id(&self.db, request_id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?;
        let classroom = classrooms::find_by_id(&self.db, &request.classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;
        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you are not allowed to view this request".to_string(),
            ));
        }
        Ok(request)
    }

    pub async fn my_requests(
        &self,
        student: &User,
        range: Option<DateRange>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(leave_requests::list_by_student(&self.db, &student.id, range).await?)
    }

    pub async fn pending_for_class(
        &self,
        instructor: &User,
        classroom_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        self.require_ownership(instructor, classroom_id).await?;
        Ok(leave_requests::list_for_classroom_by_status(
            &self.db,
            classroom_id,
            LeaveStatus::Pending,
            range,
        )
        .await?)
    }

    pub async fn all_for_class(
        &self,
        instructor: &User,
        classroom_id: &str,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        self.require_ownership(instructor, classroom_id).await?;
        Ok(leave_requests::list_for_classroom(&self.db, classroom_id).await?)
    }

    pub async fn all_for_instructor(
        &self,
        instructor: &User,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(leave_requests::list_for_instructor(&self.db, &instructor.id).await?)
    }

    async fn require_ownership(
        &self,
        instructor: &User,
        classroom_id: &str,
    ) -> Result<(), AppError> {
        let classroom = classrooms::find_by_id(&self.db, classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;
        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you are not the instructor of this class".to_string(),
            ));
        }
        Ok(())
    }
}
