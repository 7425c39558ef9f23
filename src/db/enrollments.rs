use sqlx::SqliteExecutor;

use crate::models::{Classroom, Enrollment, RosterEntry};

pub async fn insert<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment: &Enrollment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO enrollments (id, student_id, classroom_id, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&enrollment.id)
    .bind(&enrollment.student_id)
    .bind(&enrollment.classroom_id)
    .bind(enrollment.joined_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find<'e>(
    db: impl SqliteExecutor<'e>,
    student_id: &str,
    classroom_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT id, student_id, classroom_id, joined_at FROM enrollments \
         WHERE student_id = ? AND classroom_id = ?",
    )
    .bind(student_id)
    .bind(classroom_id)
    .fetch_optional(db)
    .await
}

pub async fn exists<'e>(
    db: impl SqliteExecutor<'e>,
    student_id: &str,
    classroom_id: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND classroom_id = ?",
    )
    .bind(student_id)
    .bind(classroom_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn delete<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM enrollments WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn count_for_classroom<'e>(
    db: impl SqliteExecutor<'e>,
    classroom_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE classroom_id = ?")
        .bind(classroom_id)
        .fetch_one(db)
        .await
}

pub async fn roster<'e>(
    db: impl SqliteExecutor<'e>,
    classroom_id: &str,
) -> Result<Vec<RosterEntry>, sqlx::Error> {
    sqlx::query_as::<_, RosterEntry>(
        "SELECT e.id AS enrollment_id, u.id AS student_id, u.email, u.full_name, e.joined_at \
         FROM enrollments e JOIN users u ON u.id = e.student_id \
         WHERE e.classroom_id = ? ORDER BY e.joined_at",
    )
    .bind(classroom_id)
    .fetch_all(db)
    .await
}

pub async fn classrooms_for_student<'e>(
    db: impl SqliteExecutor<'e>,
    student_id: &str,
) -> Result<Vec<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(
        "SELECT c.id, c.name, c.description, c.join_code, c.instructor_id, c.created_at \
         FROM classrooms c JOIN enrollments e ON e.classroom_id = c.id \
         WHERE e.student_id = ? ORDER BY c.id",
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}
