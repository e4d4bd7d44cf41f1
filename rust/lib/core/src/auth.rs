//! Authenticated principal shared by all modules.
//!
//! Modules do NOT depend on the auth module. The bearer middleware
//! inserts a [`CurrentUser`] into request extensions and handlers read
//! it with `Extension<CurrentUser>`.

use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// The caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied("admin role required".into()))
        }
    }

    /// Fail with 403 unless the caller is an admin or the user `id`.
    pub fn require_self_or_admin(&self, id: i64) -> Result<(), ServiceError> {
        if self.is_admin() || self.id == id {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "user {} may not access user {}",
                self.id, id
            )))
        }
    }
}
