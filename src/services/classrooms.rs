use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{classrooms, enrollments, leave_requests};
use crate::error::AppError;
use crate::models::{Classroom, User};
use crate::services::join_code::JoinCodeGenerator;

/// Collision retry budget for join-code allocation. Collisions are rare with
/// an 8-character alphanumeric space, so hitting this bound means the
/// generator is broken or the store is pathologically full.
const MAX_CODE_ATTEMPTS: u32 = 16;

pub struct ClassroomService {
    db: SqlitePool,
    codes: Arc<dyn JoinCodeGenerator>,
}

impl ClassroomService {
    pub fn new(db: SqlitePool, codes: Arc<dyn JoinCodeGenerator>) -> Self {
        Self { db, codes }
    }

    pub async fn create(
        &self,
        instructor: &User,
        id: String,
        name: String,
        description: Option<String>,
    ) -> Result<Classroom, AppError> {
        let mut tx = self.db.begin().await?;

        if classrooms::find_by_id(&mut *tx, &id).await?.is_some() {
            return Err(AppError::Conflict("class id already in use".to_string()));
        }

        let mut join_code = None;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = self.codes.generate();
            if classrooms::find_by_join_code(&mut *tx, &candidate)
                .await?
                .is_none()
            {
                join_code = Some(candidate);
                break;
            }
            warn!(attempt, "join code collision, regenerating");
        }
        let join_code = join_code.ok_or_else(|| {
            AppError::Conflict("could not allocate a unique join code".to_string())
        })?;

        let classroom = Classroom {
            id,
            name,
            description,
            join_code,
            instructor_id: instructor.id.clone(),
            created_at: Utc::now(),
        };
        classrooms::insert(&mut *tx, &classroom).await?;
        tx.commit().await?;

        info!(classroom_id = %classroom.id, "classroom created");
        Ok(classroom)
    }

    pub async fn update(
        &self,
        instructor: &User,
        id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Classroom, AppError> {
        let mut tx = self.db.begin().await?;

        let mut classroom = classrooms::find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;

        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you are not allowed to update this classroom".to_string(),
            ));
        }

        // A blank name means "leave as is", not an error; an explicit empty
        // description is a real update.
        if let Some(name) = name {
            if !name.trim().is_empty() {
                classroom.name = name;
            }
        }
        if let Some(description) = description {
            classroom.description = Some(description);
        }

        classrooms::update_details(&mut *tx, &classroom).await?;
        tx.commit().await?;
        Ok(classroom)
    }

    pub async fn delete(&self, instructor: &User, id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let classroom = classrooms::find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("classroom"))?;

        if classroom.instructor_id != instructor.id {
            return Err(AppError::Forbidden(
                "you can only delete your own class".to_string(),
            ));
        }

        if enrollments::count_for_classroom(&mut *tx, id).await? > 0 {
            return Err(AppError::Conflict(
                "cannot delete class with enrolled students".to_string(),
            ));
        }

        if leave_requests::exists_for_classroom(&mut *tx, id).await? {
            return Err(AppError::Conflict(
                "cannot delete class with leave requests".to_string(),
            ));
        }

        classrooms::delete(&mut *tx, id).await?;
        tx.commit().await?;

        info!(classroom_id = %id, "classroom deleted");
        Ok(())
    }

    pub async fn my_teaching(&self, instructor: &User) -> Result<Vec<Classroom>, AppError> {
        Ok(classrooms::list_by_instructor(&self.db, &instructor.id).await?)
    }
}
