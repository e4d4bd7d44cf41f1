use amc_core::{
    like_pattern, now_rfc3339, CurrentUser, ListResult, Role, ServiceError, Validator,
};
use amc_sql::Value;

use crate::model::{NewUser, UpdateUser, User, UserQuery};
use crate::service::password::hash_password;
use crate::service::{sql_err, user_from_row, AuthService, USER_COLUMNS};

/// Canonical stored form of an email address.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    /// Create a new user after validating every field.
    pub fn create_user(&self, input: NewUser) -> Result<User, ServiceError> {
        let mut v = Validator::new();
        v.required("name", &input.name, 100)
            .email("email", &input.email)
            .password("password", &input.password);
        v.finish()?;

        let hash = hash_password(&input.password)?;
        self.insert_user(input.name.trim(), &normalize_email(&input.email), &hash, input.role)
    }

    /// Insert a user whose password is already hashed.
    pub(crate) fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        let now = now_rfc3339();
        let id = self
            .sql
            .insert(
                "INSERT INTO users (name, email, password_hash, role, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                &[
                    Value::from(name),
                    Value::from(email),
                    Value::from(password_hash),
                    Value::from(role.as_str()),
                    Value::from(now),
                ],
            )
            .map_err(sql_err)?;

        tracing::info!(user_id = id, role = role.as_str(), "created user {}", email);
        self.get_user(id)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let rows = self.sql.query(&sql, &[Value::Integer(id)]).map_err(sql_err)?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))?;
        user_from_row(row)
    }

    /// Look a user up by email, returning the stored password hash alongside.
    pub(crate) fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>, ServiceError> {
        let sql = format!("SELECT {}, password_hash FROM users WHERE email = ?1", USER_COLUMNS);
        let rows = self
            .sql
            .query(&sql, &[Value::from(normalize_email(email))])
            .map_err(sql_err)?;
        match rows.first() {
            Some(row) => {
                let hash = row
                    .get_str("password_hash")
                    .ok_or_else(|| ServiceError::Internal("missing password_hash".into()))?
                    .to_string();
                Ok(Some((user_from_row(row)?, hash)))
            }
            None => Ok(None),
        }
    }

    /// List users with filters and pagination, ordered by id.
    pub fn list_users(&self, query: &UserQuery) -> Result<ListResult<User>, ServiceError> {
        let page = query.page_params().resolve()?;

        let mut where_clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(Value::from(like_pattern(q)));
            let idx = params.len();
            where_clauses.push(format!(
                "(unicode_lower(name) LIKE ?{idx} ESCAPE '\\' OR email LIKE ?{idx} ESCAPE '\\')"
            ));
        }
        if let Some(role) = query.role {
            params.push(Value::from(role.as_str()));
            where_clauses.push(format!("role = ?{}", params.len()));
        }
        if let Some(active) = query.active {
            params.push(Value::from(active));
            where_clauses.push(format!("active = ?{}", params.len()));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        // Count
        let count_sql = format!("SELECT COUNT(*) AS cnt FROM users{}", where_sql);
        let count_rows = self.sql.query(&count_sql, &params).map_err(sql_err)?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as u64;

        // Items
        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(page.limit as i64));
        params.push(Value::Integer(page.offset()));

        let sql = format!(
            "SELECT {} FROM users{} ORDER BY id ASC LIMIT ?{} OFFSET ?{}",
            USER_COLUMNS, where_sql, limit_idx, offset_idx,
        );
        let rows = self.sql.query(&sql, &params).map_err(sql_err)?;
        let items = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(ListResult::new(items, total, page))
    }

    /// Apply an admin edit. Admins cannot demote or deactivate themselves.
    pub fn update_user(
        &self,
        actor: &CurrentUser,
        id: i64,
        patch: UpdateUser,
    ) -> Result<User, ServiceError> {
        let mut user = self.get_user(id)?;

        let mut v = Validator::new();
        if let Some(ref name) = patch.name {
            v.required("name", name, 100);
        }
        if actor.id == id && patch.role == Some(Role::User) {
            v.add("role", "you cannot remove your own admin role");
        }
        if actor.id == id && patch.active == Some(false) {
            v.add("active", "you cannot deactivate your own account");
        }
        v.finish()?;

        if let Some(name) = patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        let deactivated = user.active && patch.active == Some(false);
        if let Some(active) = patch.active {
            user.active = active;
        }
        user.updated_at = now_rfc3339();

        self.sql
            .exec(
                "UPDATE users SET name = ?1, role = ?2, active = ?3, updated_at = ?4 WHERE id = ?5",
                &[
                    Value::from(user.name.as_str()),
                    Value::from(user.role.as_str()),
                    Value::from(user.active),
                    Value::from(user.updated_at.as_str()),
                    Value::Integer(id),
                ],
            )
            .map_err(sql_err)?;

        if deactivated {
            let revoked = self.revoke_all_user_sessions(id)?;
            tracing::info!(user_id = id, revoked, "deactivated user");
        }

        Ok(user)
    }

    /// Delete a user. Sessions and reset tokens cascade.
    pub fn delete_user(&self, actor: &CurrentUser, id: i64) -> Result<(), ServiceError> {
        if actor.id == id {
            return Err(ServiceError::Validation("you cannot delete your own account".into()));
        }
        let affected = self
            .sql
            .exec("DELETE FROM users WHERE id = ?1", &[Value::Integer(id)])
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("user {} not found", id)));
        }
        tracing::info!(user_id = id, deleted_by = actor.id, "deleted user");
        Ok(())
    }

    /// Replace a user's password hash.
    pub(crate) fn set_password_hash(&self, id: i64, hash: &str) -> Result<(), ServiceError> {
        let affected = self
            .sql
            .exec(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                &[Value::from(hash), Value::from(now_rfc3339()), Value::Integer(id)],
            )
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("user {} not found", id)));
        }
        Ok(())
    }

    /// Make sure the configured administrator exists with the admin role.
    ///
    /// An existing account keeps its password; only role and active flag
    /// are enforced.
    pub fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ServiceError> {
        match self.find_credentials(email)? {
            Some((user, _)) if user.role == Role::Admin && user.active => {
                tracing::info!("admin account {} already exists", user.email);
                Ok(user)
            }
            Some((user, _)) => {
                self.sql
                    .exec(
                        "UPDATE users SET role = 'admin', active = 1, updated_at = ?1 WHERE id = ?2",
                        &[Value::from(now_rfc3339()), Value::Integer(user.id)],
                    )
                    .map_err(sql_err)?;
                tracing::info!("promoted {} to admin", user.email);
                self.get_user(user.id)
            }
            None => self.insert_user(name, &normalize_email(email), password_hash, Role::Admin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    fn admin_of(user: &User) -> CurrentUser {
        CurrentUser::from(user)
    }

    #[test]
    fn test_user_crud() {
        let (svc, _) = testing::service();

        // Create
        let user = svc
            .create_user(NewUser {
                name: " Alice ".to_string(),
                email: "Alice@Example.COM".to_string(),
                password: "password123".to_string(),
                role: Role::User,
            })
            .unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.active);

        // Get
        let fetched = svc.get_user(user.id).unwrap();
        assert_eq!(fetched, user);

        // Update
        let admin = testing::user(&svc, "Root", Role::Admin);
        let updated = svc
            .update_user(
                &admin_of(&admin),
                user.id,
                UpdateUser { name: Some("Alice W.".into()), ..Default::default() },
            )
            .unwrap();
        assert_eq!(updated.name, "Alice W.");
        assert_eq!(updated.id, user.id);

        // List
        let list = svc.list_users(&UserQuery::default()).unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.items[0].name, "Alice W.");

        // Delete
        svc.delete_user(&admin_of(&admin), user.id).unwrap();
        assert!(matches!(svc.get_user(user.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let (svc, _) = testing::service();
        testing::user(&svc, "Bob", Role::User);

        let err = svc
            .create_user(NewUser {
                name: "Bobby".into(),
                email: "BOB@example.com".into(),
                password: "password123".into(),
                role: Role::User,
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)), "got {:?}", err);
    }

    #[test]
    fn test_create_validates_fields() {
        let (svc, _) = testing::service();
        let err = svc
            .create_user(NewUser {
                name: "".into(),
                email: "nope".into(),
                password: "short".into(),
                role: Role::User,
            })
            .unwrap_err();
        let fields: Vec<_> = err.details().unwrap().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
    }

    #[test]
    fn test_list_filters_and_pages() {
        let (svc, _) = testing::service();
        for name in ["Ann", "Ben", "Cid", "Dee", "Eve"] {
            testing::user(&svc, name, Role::User);
        }
        testing::user(&svc, "Boss", Role::Admin);

        let admins = svc
            .list_users(&UserQuery { role: Some(Role::Admin), ..Default::default() })
            .unwrap();
        assert_eq!(admins.total, 1);
        assert_eq!(admins.items[0].name, "Boss");

        let page2 = svc
            .list_users(&UserQuery { page: Some(2), limit: Some(4), ..Default::default() })
            .unwrap();
        assert_eq!(page2.total, 6);
        assert_eq!(page2.total_pages, 2);
        assert_eq!(page2.items.len(), 2);
        assert_eq!(page2.items[0].name, "Eve");

        let search = svc
            .list_users(&UserQuery { q: Some("EE".into()), ..Default::default() })
            .unwrap();
        assert_eq!(search.total, 1);
        assert_eq!(search.items[0].name, "Dee");
    }

    #[test]
    fn test_admin_cannot_demote_or_delete_self() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let me = admin_of(&admin);

        let err = svc
            .update_user(&me, admin.id, UpdateUser { role: Some(Role::User), ..Default::default() })
            .unwrap_err();
        assert_eq!(err.details().unwrap()[0].field, "role");

        assert!(matches!(svc.delete_user(&me, admin.id), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_ensure_admin_is_idempotent() {
        let (svc, _) = testing::service();
        let hash = hash_password("bootstrap-pass").unwrap();

        let first = svc.ensure_admin("Admin", "admin@example.com", &hash).unwrap();
        let second = svc.ensure_admin("Admin", "ADMIN@example.com", &hash).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Admin);

        // An existing plain user is promoted.
        let carol = testing::user(&svc, "Carol", Role::User);
        let promoted = svc.ensure_admin("Carol", &carol.email, &hash).unwrap();
        assert_eq!(promoted.id, carol.id);
        assert_eq!(promoted.role, Role::Admin);
    }
}
