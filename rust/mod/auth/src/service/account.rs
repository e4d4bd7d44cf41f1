//! Self-service account flows: register, login, logout, password reset.

use amc_core::{new_id, now_rfc3339, Role, ServiceError, Validator};
use amc_sql::{SQLError, Value};

use crate::mailer::OutgoingMail;
use crate::model::{
    ChangePasswordRequest, LoginRequest, NewUser, RegisterRequest, ResetPasswordRequest,
    TokenResponse,
};
use crate::service::password::{hash_password, verify_password};
use crate::service::{sql_err, AuthService};

/// Message returned for every forgot-password request.
pub const RESET_REQUESTED_MESSAGE: &str =
    "if that email is registered, a password reset link has been sent";

impl AuthService {
    /// Create a regular account and sign it in.
    pub fn register(&self, req: RegisterRequest) -> Result<TokenResponse, ServiceError> {
        let user = self.create_user(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            role: Role::User,
        })?;
        tracing::info!(user_id = user.id, "registered {}", user.email);
        self.issue_token(&user)
    }

    /// Exchange email + password for a token.
    ///
    /// Unknown email, wrong password and inactive account all produce the
    /// same 401 so callers cannot probe which accounts exist.
    pub fn login(&self, req: LoginRequest) -> Result<TokenResponse, ServiceError> {
        let mut v = Validator::new();
        v.required("email", &req.email, 254);
        v.required("password", &req.password, 1024);
        v.finish()?;

        let invalid = || ServiceError::Unauthorized("invalid credentials".into());

        let Some((user, hash)) = self.find_credentials(&req.email)? else {
            tracing::warn!("login failed: unknown email");
            return Err(invalid());
        };
        if !verify_password(&req.password, &hash) {
            tracing::warn!(user_id = user.id, "login failed: wrong password");
            return Err(invalid());
        }
        if !user.active {
            tracing::warn!(user_id = user.id, "login failed: account inactive");
            return Err(invalid());
        }

        tracing::info!(user_id = user.id, "login ok");
        self.issue_token(&user)
    }

    /// Revoke the session behind the current token.
    pub fn logout(&self, session_id: &str) -> Result<(), ServiceError> {
        self.revoke_session(session_id)
    }

    /// Start a password reset. Succeeds whether or not the email is known.
    pub fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let mut v = Validator::new();
        v.email("email", email);
        v.finish()?;

        let Some((user, _)) = self.find_credentials(email)? else {
            tracing::info!("password reset requested for unknown email");
            return Ok(());
        };
        if !user.active {
            return Ok(());
        }

        let token = new_id();
        let now = chrono::Utc::now();
        let expires_at = now + chrono::Duration::seconds(self.config.reset_token_ttl);

        self.sql
            .exec(
                "INSERT INTO password_resets (token, user_id, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::from(token.as_str()),
                    Value::Integer(user.id),
                    Value::from(expires_at.to_rfc3339()),
                    Value::from(now.to_rfc3339()),
                ],
            )
            .map_err(sql_err)?;

        let link = format!("{}?token={}", self.config.reset_url, token);
        self.mailer.send(&OutgoingMail {
            from: self.config.mail_from.clone(),
            to: user.email.clone(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hello {},\n\nUse the link below to choose a new password. \
                 It expires in {} minutes.\n\n{}\n\nIf you did not ask for this, ignore this email.\n",
                user.name,
                self.config.reset_token_ttl / 60,
                link
            ),
        })?;

        tracing::info!(user_id = user.id, "password reset link sent");
        Ok(())
    }

    /// Finish a password reset with a token from [`Self::forgot_password`].
    pub fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), ServiceError> {
        let mut v = Validator::new();
        v.required("token", &req.token, 128)
            .password("password", &req.password);
        v.finish()?;

        let invalid = || ServiceError::field("token", "is invalid or has expired");

        let rows = self
            .sql
            .query(
                "SELECT user_id, expires_at, used_at FROM password_resets WHERE token = ?1",
                &[Value::from(req.token.trim())],
            )
            .map_err(sql_err)?;
        let row = rows.first().ok_or_else(invalid)?;

        if row.get_str("used_at").is_some() {
            return Err(invalid());
        }
        let expires_at = row
            .get_str("expires_at")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .ok_or_else(invalid)?;
        if expires_at < chrono::Utc::now() {
            return Err(invalid());
        }
        let user_id = row.get_i64("user_id").ok_or_else(invalid)?;

        let hash = hash_password(&req.password)?;
        let token = req.token.trim();
        let now = now_rfc3339();

        // Consuming the token, storing the hash and revoking sessions
        // commit together or not at all.
        let mut revoked = None;
        self.sql
            .transaction(&mut |tx| {
                let consumed = tx.exec(
                    "UPDATE password_resets SET used_at = ?1 WHERE token = ?2 AND used_at IS NULL",
                    &[Value::from(now.as_str()), Value::from(token)],
                )?;
                if consumed == 0 {
                    return Ok(());
                }
                let updated = tx.exec(
                    "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                    &[Value::from(hash.as_str()), Value::from(now.as_str()), Value::Integer(user_id)],
                )?;
                if updated == 0 {
                    return Err(SQLError::Execution(format!("user {} not found", user_id)));
                }
                revoked = Some(tx.exec(
                    "UPDATE sessions SET revoked = 1 WHERE user_id = ?1 AND revoked = 0",
                    &[Value::Integer(user_id)],
                )?);
                Ok(())
            })
            .map_err(sql_err)?;

        let Some(revoked) = revoked else {
            return Err(invalid());
        };
        tracing::info!(user_id, revoked, "password reset completed");
        Ok(())
    }

    /// Change the password of a signed-in user.
    pub fn change_password(
        &self,
        user_id: i64,
        req: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let mut v = Validator::new();
        v.password("new_password", &req.new_password);
        v.finish()?;

        let user = self.get_user(user_id)?;
        let (_, hash) = self
            .find_credentials(&user.email)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", user_id)))?;
        if !verify_password(&req.current_password, &hash) {
            return Err(ServiceError::field("current_password", "is incorrect"));
        }

        self.set_password_hash(user_id, &hash_password(&req.new_password)?)?;
        tracing::info!(user_id, "password changed");
        Ok(())
    }
}
