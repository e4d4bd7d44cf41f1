pub mod account;
pub mod password;
pub mod schema;
pub mod session;
pub mod user;

use std::sync::Arc;

use amc_core::{Role, ServiceError};
use amc_sql::{Row, SQLError, SQLStore};

use crate::mailer::{LogMailer, Mailer};
use crate::model::User;

/// Configuration for the auth service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 24h).
    pub access_token_ttl: i64,
    /// Password reset token lifetime in seconds (default: 1h).
    pub reset_token_ttl: i64,
    /// Base URL of the reset form; the token is appended as `?token=`.
    pub reset_url: String,
    /// Sender address for outgoing mail.
    pub mail_from: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "amc-dev-secret-change-me".to_string(),
            access_token_ttl: 86400,       // 24h
            reset_token_ttl: 3600,         // 1h
            reset_url: "http://localhost:3000/reset-password".to_string(),
            mail_from: "no-reply@localhost".to_string(),
        }
    }
}

/// The Auth service. Holds storage, mail transport and configuration.
pub struct AuthService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) config: AuthConfig,
}

impl AuthService {
    /// Create a new AuthService, initializing the DB schema.
    pub fn new(sql: Arc<dyn SQLStore>, config: AuthConfig) -> Result<Arc<Self>, ServiceError> {
        Self::with_mailer(sql, Arc::new(LogMailer), config)
    }

    /// Like [`AuthService::new`] with an explicit mail transport.
    pub fn with_mailer(
        sql: Arc<dyn SQLStore>,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Result<Arc<Self>, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql, mailer, config }))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Map a store error, turning a UNIQUE violation into a 409.
pub(crate) fn sql_err(e: SQLError) -> ServiceError {
    match e {
        SQLError::Unique(_) => ServiceError::Conflict("email is already registered".into()),
        other => ServiceError::Storage(other.to_string()),
    }
}

/// Columns selected wherever a [`User`] is read.
pub(crate) const USER_COLUMNS: &str = "id, name, email, role, active, created_at, updated_at";

pub(crate) fn user_from_row(row: &Row) -> Result<User, ServiceError> {
    let missing = |col: &str| ServiceError::Internal(format!("users row missing column {}", col));
    let role = row.get_str("role").ok_or_else(|| missing("role"))?;
    Ok(User {
        id: row.get_i64("id").ok_or_else(|| missing("id"))?,
        name: row.get_str("name").ok_or_else(|| missing("name"))?.to_string(),
        email: row.get_str("email").ok_or_else(|| missing("email"))?.to_string(),
        role: Role::parse(role)
            .ok_or_else(|| ServiceError::Internal(format!("unknown role {:?}", role)))?,
        active: row.get_bool("active").ok_or_else(|| missing("active"))?,
        created_at: row.get_str("created_at").ok_or_else(|| missing("created_at"))?.to_string(),
        updated_at: row.get_str("updated_at").ok_or_else(|| missing("updated_at"))?.to_string(),
    })
}
