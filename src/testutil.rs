//! Shared fixtures for service unit tests: a single-connection in-memory
//! database plus scripted collaborators.

use std::sync::Mutex;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use crate::db::users;
use crate::models::{Role, User};
use crate::services::join_code::JoinCodeGenerator;

/// In-memory SQLite pinned to one connection so every query sees the same
/// database, with migrations applied.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn make_user(pool: &SqlitePool, email: &str, role: Role) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        full_name: format!("Test {email}"),
        password_hash: "unused".to_string(),
        role,
        created_at: Utc::now(),
    };
    users::insert(pool, &user).await.expect("insert user");
    user
}

/// Join-code generator that replays a fixed script, for collision tests.
pub struct ScriptedCodes {
    codes: Mutex<Vec<String>>,
}

impl ScriptedCodes {
    pub fn new(codes: Vec<&str>) -> Self {
        Self {
            codes: Mutex::new(codes.into_iter().map(String::from).collect()),
        }
    }
}

impl JoinCodeGenerator for ScriptedCodes {
    fn generate(&self) -> String {
        let mut codes = self.codes.lock().expect("codes lock");
        if codes.is_empty() {
            panic!("scripted code generator exhausted");
        }
        codes.remove(0)
    }
}
