use amc_core::{new_id, CurrentUser, ServiceError};
use amc_sql::Value;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::model::{Claims, Session, TokenResponse, User};
use crate::service::{sql_err, AuthService};

impl AuthService {
    /// Issue a JWT access token for a user.
    ///
    /// Creates a session record so the token can later be revoked.
    pub fn issue_token(&self, user: &User) -> Result<TokenResponse, ServiceError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.config.access_token_ttl);

        let session = Session {
            id: new_id(),
            user_id: user.id,
            issued_at: now.to_rfc3339(),
            expires_at: exp.to_rfc3339(),
            revoked: false,
        };

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            sid: session.id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("JWT encode failed: {}", e)))?;

        self.sql
            .exec(
                "INSERT INTO sessions (id, user_id, revoked, issued_at, expires_at)
                 VALUES (?1, ?2, 0, ?3, ?4)",
                &[
                    Value::from(session.id.as_str()),
                    Value::Integer(session.user_id),
                    Value::from(session.issued_at.as_str()),
                    Value::from(session.expires_at.as_str()),
                ],
            )
            .map_err(sql_err)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl,
            user: user.clone(),
        })
    }

    /// Verify and decode a JWT access token.
    /// Returns the claims if valid and the session is not revoked.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

        let claims = token_data.claims;
        let session = self.get_session(&claims.sid)?;
        if session.revoked {
            return Err(ServiceError::Unauthorized("session has been revoked".into()));
        }

        Ok(claims)
    }

    /// Resolve a bearer token to the caller, re-reading the stored user so
    /// role changes and deactivation apply immediately.
    pub fn authenticate(&self, token: &str) -> Result<(Claims, CurrentUser), ServiceError> {
        let claims = self.verify_token(token)?;
        let user = self
            .get_user(claims.user_id()?)
            .map_err(|_| ServiceError::Unauthorized("user no longer exists".into()))?;
        if !user.active {
            return Err(ServiceError::Unauthorized("user is deactivated".into()));
        }
        Ok((claims, CurrentUser::from(&user)))
    }

    /// Get a session by id. Unknown sessions are treated as unauthorized.
    pub fn get_session(&self, id: &str) -> Result<Session, ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT id, user_id, revoked, issued_at, expires_at FROM sessions WHERE id = ?1",
                &[Value::from(id)],
            )
            .map_err(sql_err)?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::Unauthorized("unknown session".into()))?;
        Ok(Session {
            id: id.to_string(),
            user_id: row.get_i64("user_id").unwrap_or_default(),
            issued_at: row.get_str("issued_at").unwrap_or_default().to_string(),
            expires_at: row.get_str("expires_at").unwrap_or_default().to_string(),
            revoked: row.get_bool("revoked").unwrap_or(true),
        })
    }

    /// Revoke a session (token becomes invalid).
    pub fn revoke_session(&self, session_id: &str) -> Result<(), ServiceError> {
        let affected = self
            .sql
            .exec(
                "UPDATE sessions SET revoked = 1 WHERE id = ?1",
                &[Value::from(session_id)],
            )
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("session {} not found", session_id)));
        }
        Ok(())
    }

    /// Revoke all sessions for a user.
    pub fn revoke_all_user_sessions(&self, user_id: i64) -> Result<u64, ServiceError> {
        self.sql
            .exec(
                "UPDATE sessions SET revoked = 1 WHERE user_id = ?1 AND revoked = 0",
                &[Value::Integer(user_id)],
            )
            .map_err(sql_err)
    }
}

#[cfg(test)]
mod tests {
    use amc_core::Role;

    use crate::model::UpdateUser;
    use crate::service::testing;

    use super::*;

    #[test]
    fn test_issue_and_verify_token() {
        let (svc, _) = testing::service();
        let user = testing::user(&svc, "Alice", Role::User);

        let tokens = svc.issue_token(&user).unwrap();
        assert!(!tokens.access_token.is_empty());
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 86400);

        let claims = svc.verify_token(&tokens.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_revoke_session() {
        let (svc, _) = testing::service();
        let user = testing::user(&svc, "Charlie", Role::User);

        let tokens = svc.issue_token(&user).unwrap();
        let claims = svc.verify_token(&tokens.access_token).unwrap();

        svc.revoke_session(&claims.sid).unwrap();
        assert!(matches!(
            svc.verify_token(&tokens.access_token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_revoke_all_user_sessions() {
        let (svc, _) = testing::service();
        let user = testing::user(&svc, "Dave", Role::User);

        let t1 = svc.issue_token(&user).unwrap();
        let t2 = svc.issue_token(&user).unwrap();
        assert!(svc.verify_token(&t1.access_token).is_ok());
        assert!(svc.verify_token(&t2.access_token).is_ok());

        assert_eq!(svc.revoke_all_user_sessions(user.id).unwrap(), 2);
        assert!(svc.verify_token(&t1.access_token).is_err());
        assert!(svc.verify_token(&t2.access_token).is_err());
    }

    #[test]
    fn test_authenticate_reads_current_role() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let user = testing::user(&svc, "Erin", Role::User);
        let tokens = svc.issue_token(&user).unwrap();

        svc.update_user(
            &CurrentUser::from(&admin),
            user.id,
            UpdateUser { role: Some(Role::Admin), ..Default::default() },
        )
        .unwrap();

        let (_, current) = svc.authenticate(&tokens.access_token).unwrap();
        assert_eq!(current.role, Role::Admin);
    }

    #[test]
    fn test_deactivated_user_is_rejected() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let user = testing::user(&svc, "Finn", Role::User);
        let tokens = svc.issue_token(&user).unwrap();

        svc.update_user(
            &CurrentUser::from(&admin),
            user.id,
            UpdateUser { active: Some(false), ..Default::default() },
        )
        .unwrap();

        assert!(matches!(
            svc.authenticate(&tokens.access_token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let (svc, _) = testing::service();
        let user = testing::user(&svc, "Gus", Role::User);
        let forged = encode(
            &Header::default(),
            &Claims {
                sub: user.id.to_string(),
                email: user.email.clone(),
                role: Role::Admin,
                sid: "nope".into(),
                iat: chrono::Utc::now().timestamp(),
                exp: chrono::Utc::now().timestamp() + 600,
            },
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();
        assert!(svc.verify_token(&forged).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let (svc, _) = testing::service();
        assert!(svc.verify_token("this.is.not.a.valid.jwt").is_err());
    }
}
