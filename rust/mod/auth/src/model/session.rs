use amc_core::{CurrentUser, Role, ServiceError};
use serde::{Deserialize, Serialize};

use crate::model::User;

/// A JWT issuance record, used for logout and revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session id (UUIDv4, no dashes).
    pub id: String,

    /// User id that owns this session.
    pub user_id: i64,

    /// RFC 3339 timestamp when the token was issued.
    pub issued_at: String,

    /// RFC 3339 timestamp when the token expires.
    pub expires_at: String,

    /// Whether this session has been revoked.
    #[serde(default)]
    pub revoked: bool,
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,

    /// Login email.
    pub email: String,

    /// Role at issue time. Authorization re-reads the stored role.
    pub role: Role,

    /// Session id (for logout/revoke).
    pub sid: String,

    /// Issued at (unix timestamp).
    pub iat: i64,

    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Numeric user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, ServiceError> {
        self.sub
            .parse()
            .map_err(|_| ServiceError::Unauthorized("invalid token subject".into()))
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Token returned after register or login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}
