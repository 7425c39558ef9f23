use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtKeys;
use crate::services::JoinCodeGenerator;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub codes: Arc<dyn JoinCodeGenerator>,
    pub jwt: JwtKeys,
}
