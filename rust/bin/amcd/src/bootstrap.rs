//! Bootstrap: first-start checks and admin account creation.
//!
//! When amcd starts:
//! 1. Verify the config is usable. If not, refuse to start.
//! 2. Ensure the configured admin account exists with the admin role.

use auth::service::AuthService;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.jwt.expire_secs <= 0 {
        anyhow::bail!("jwt.expire_secs must be positive.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if let Some(admin) = &config.admin {
        if admin.email.trim().is_empty() {
            anyhow::bail!("admin.email is empty in configuration.");
        }
        if admin.password_hash.is_empty() {
            anyhow::bail!(
                "No admin password hash found in configuration.\n\
                 Run `amcd hash-password` and paste the result into [admin].password_hash."
            );
        }
    }
    if config.mail.reset_ttl_secs <= 0 {
        anyhow::bail!("mail.reset_ttl_secs must be positive.");
    }
    Ok(())
}

/// Ensure the configured admin account exists.
pub fn ensure_admin(auth: &AuthService, config: &ServerConfig) -> anyhow::Result<()> {
    let Some(admin) = &config.admin else {
        warn!("no [admin] section configured; skipping admin bootstrap");
        return Ok(());
    };
    let user = auth
        .ensure_admin(&admin.name, &admin.email, &admin.password_hash)
        .map_err(|e| anyhow::anyhow!("failed to bootstrap admin account: {}", e))?;
    info!(user_id = user.id, "admin account {} ready", user.email);
    Ok(())
}
