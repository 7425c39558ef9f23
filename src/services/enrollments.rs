use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::{classrooms, enrollments, leave_requests};
use crate::error::AppError;
use crate::models::{Classroom, Enrollment, RosterEntry, User};

pub struct EnrollmentService {
    db: SqlitePool,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Redeems a join code. Codes are stored uppercase, so redemption is
    /// case-insensitive.
    pub async fn join_by_code(&self, student: &User, code: &str) -> Result<Enrollment, AppError> {
        let code = code.trim().to_uppercase();
        let mut tx = self.db.begin().await?;

        let classroom = classrooms::find_by_join_code(&mut *tx, &code)
            .await?
            .ok_or(AppError::NotFound("join code"))?;

        if enrollments::exists(&mut *tx, &student.id, &classroom.id).await? {
            return Err(AppError::Conflict("already enrolled".to_string()));
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4().to_string(),
            student_id: student.id.clone(),
            classroom_id: classroom.id.clone(),
            joined_at: Utc::now(),
        };
        enrollments::insert(&mut *tx, &enrollment).await?;
        tx.commit().await?;

        info!(classroom_id = %classroom.id, student_id = %student.id, "student enrolled");
        Ok(enrollment)
    }

    /// Voluntary withdrawal. Blocked while any leave request exists for the
    /// pair, whatever its status, so history never loses its enrollment.
    pub async fn leave(&self, student: &User, classroom_id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        classrooms::find_by_id(&mut *tx, classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;

        let enrollment = enrollments::find(&mut *tx, &student.id, classroom_id)
            .await?
            .ok_or(AppError::NotFound("enrollment"))?;

        if leave_requests::exists_for_student_in_classroom(&mut *tx, &student.id, classroom_id)
            .await?
        {
            return Err(AppError::Conflict(
                "cannot leave class with leave requests on record".to_string(),
            ));
        }

        enrollments::delete(&mut *tx, &enrollment.id).await?;
        tx.commit().await?;

        info!(classroom_id = %classroom_id, student_id = %student.id, "student left class");
        Ok(())
    }

    pub async fn students_in_class(
        &self,
        instructor: &User,
        classroom_id: &str,
    ) -> Result<Vec<RosterEntry>, AppError> {
        let classroom = classrooms::find_by_id(&self.db, classroom_id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;

        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you are not the instructor of this class".to_string(),
            ));
        }

        Ok(enrollments::roster(&self.db, classroom_id).await?)
    }

    pub async fn my_enrolled(&self, student: &User) -> Result<Vec<Classroom>, AppError> {
        Ok(enrollments::classrooms_for_student(&self.db, &student.id).await?)
    }
}
