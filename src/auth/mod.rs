pub mod jwt;

pub use jwt::{Claims, JwtKeys};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::users;
use crate::error::AppError;
use crate::models::{AuthResponse, Role, User};
use crate::state::AppState;

pub struct AuthService {
    db: SqlitePool,
    jwt: JwtKeys,
}

impl AuthService {
    pub fn new(db: SqlitePool, jwt: JwtKeys) -> Self {
        Self { db, jwt }
    }

    pub async fn register(
        &self,
        email: String,
        full_name: String,
        password: String,
        role: Role,
    ) -> Result<AuthResponse, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::Validation("email is required".to_string()));
        }
        if password.len() < 8 {
            return Err(AppError::Validation(
                "password must be at least 8 characters".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        if users::find_by_email(&mut *tx, &email).await?.is_some() {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            full_name,
            password_hash: hash_password(&password)?,
            role,
            created_at: Utc::now(),
        };
        users::insert(&mut *tx, &user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, role = ?user.role, "user registered");
        self.respond(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let email = email.trim().to_lowercase();
        let user = users::find_by_email(&self.db, &email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::Unauthorized("invalid credentials".to_string()));
        }

        self.respond(user)
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AppError> {
        let token = self.jwt.issue(&user.id, user.role)?;
        Ok(AuthResponse {
            token,
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        })
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// The authenticated caller, resolved from the Bearer token. Handlers take
/// this extractor and pass the inner `User` to the services explicitly.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a bearer token".to_string()))?;

        let claims = state.jwt.verify(token)?;
        let user = users::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

        Ok(CurrentUser(user))
    }
}

pub fn require_instructor(user: &User) -> Result<(), AppError> {
    match user.role {
        Role::Instructor => Ok(()),
        Role::Student => Err(AppError::Forbidden("instructor role required".to_string())),
    }
}

pub fn require_student(user: &User) -> Result<(), AppError> {
    match user.role {
        Role::Student => Ok(()),
        Role::Instructor => Err(AppError::Forbidden("student role required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_pool;

    fn keys() -> JwtKeys {
        JwtKeys::from_secret(b"test-secret")
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let pool = test_pool().await;
        let service = AuthService::new(pool.clone(), keys());

        let registered = service
            .register(
                "S@Example.com".into(),
                "Student One".into(),
                "hunter2hunter2".into(),
                Role::Student,
            )
            .await
            .expect("register");
        assert_eq!(registered.email, "s@example.com");

        let logged_in = service
            .login("s@example.com", "hunter2hunter2")
            .await
            .expect("login");
        assert_eq!(logged_in.user_id, registered.user_id);
        assert_eq!(logged_in.role, Role::Student);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let pool = test_pool().await;
        let service = AuthService::new(pool.clone(), keys());
        service
            .register("s@example.com".into(), "One".into(), "password1".into(), Role::Student)
            .await
            .expect("register");

        let err = service
            .register("s@example.com".into(), "Two".into(), "password2".into(), Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let pool = test_pool().await;
        let service = AuthService::new(pool.clone(), keys());
        service
            .register("s@example.com".into(), "One".into(), "password1".into(), Role::Student)
            .await
            .expect("register");

        let err = service.login("s@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = service.login("nobody@example.com", "password1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
