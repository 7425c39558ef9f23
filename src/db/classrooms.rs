use sqlx::SqliteExecutor;

use crate::models::Classroom;

const COLUMNS: &str = "id, name, description, join_code, instructor_id, created_at";

pub async fn insert<'e>(
    db: impl SqliteExecutor<'e>,
    classroom: &Classroom,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO classrooms (id, name, description, join_code, instructor_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&classroom.id)
    .bind(&classroom.name)
    .bind(&classroom.description)
    .bind(&classroom.join_code)
    .bind(&classroom.instructor_id)
    .bind(classroom.created_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {COLUMNS} FROM classrooms WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Join codes are stored uppercase; callers normalize before lookup.
pub async fn find_by_join_code<'e>(
    db: impl SqliteExecutor<'e>,
    join_code: &str,
) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {COLUMNS} FROM classrooms WHERE join_code = ?"
    ))
    .bind(join_code)
    .fetch_optional(db)
    .await
}

pub async fn update_details<'e>(
    db: impl SqliteExecutor<'e>,
    classroom: &Classroom,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE classrooms SET name = ?, description = ? WHERE id = ?")
        .bind(&classroom.name)
        .bind(&classroom.description)
        .bind(&classroom.id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM classrooms WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_instructor<'e>(
    db: impl SqliteExecutor<'e>,
    instructor_id: &str,
) -> Result<Vec<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {COLUMNS} FROM classrooms WHERE instructor_id = ? ORDER BY id"
    ))
    .bind(instructor_id)
    .fetch_all(db)
    .await
}
