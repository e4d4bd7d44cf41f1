//! Auth module: accounts, JWT sessions and user administration.
//!
//! # Resources
//!
//! - **User**: dashboard account with an `admin` or `user` role
//! - **Session**: JWT issuance record, revoked on logout or password reset
//! - **Password reset**: single-use emailed token
//!
//! # Usage
//!
//! ```ignore
//! use auth::{AuthModule, service::AuthConfig};
//!
//! let module = AuthModule::new(sql, AuthConfig::default())?;
//! let public = module.public_routes(); // register, login, reset
//! let private = module.routes();       // behind auth::api::require_auth
//! ```

pub mod api;
pub mod mailer;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use amc_core::{Module, ServiceError};
use amc_sql::SQLStore;

use crate::mailer::Mailer;
use crate::service::{AuthConfig, AuthService};

/// Auth module implementing the Module trait.
pub struct AuthModule {
    service: Arc<AuthService>,
}

impl AuthModule {
    /// Create an AuthModule that logs outgoing mail.
    pub fn new(sql: Arc<dyn SQLStore>, config: AuthConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            service: AuthService::new(sql, config)?,
        })
    }

    /// Create an AuthModule with a custom mail transport.
    pub fn with_mailer(
        sql: Arc<dyn SQLStore>,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            service: AuthService::with_mailer(sql, mailer, config)?,
        })
    }

    /// Get a reference to the underlying AuthService.
    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }
}

impl Module for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn public_routes(&self) -> Router {
        api::public_router(self.service.clone())
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
