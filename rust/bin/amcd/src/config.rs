//! Server-side configuration file (`/etc/amc/<name>.toml`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory searched for bare context names.
pub const CONFIG_DIR: &str = "/etc/amc";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    /// Bootstrap admin account. Optional once an admin exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminConfig>,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
    /// argon2id PHC string, see `amcd hash-password`.
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default = "default_reset_url")]
    pub reset_url: String,
    #[serde(default = "default_reset_ttl_secs")]
    pub reset_ttl_secs: i64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_mail_from(),
            reset_url: default_reset_url(),
            reset_ttl_secs: default_reset_ttl_secs(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_expire_secs() -> i64 {
    86400
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_mail_from() -> String {
    "no-reply@localhost".to_string()
}

fn default_reset_url() -> String {
    "http://localhost:3000/reset-password".to_string()
}

fn default_reset_ttl_secs() -> i64 {
    3600
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    ///
    /// A value containing `/` or `.` is used as-is; anything else is
    /// looked up as `/etc/amc/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(CONFIG_DIR).join(format!("{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings handed to the auth module.
    pub fn auth_config(&self) -> auth::service::AuthConfig {
        auth::service::AuthConfig {
            jwt_secret: self.jwt.secret.clone(),
            access_token_ttl: self.jwt.expire_secs,
            reset_token_ttl: self.mail.reset_ttl_secs,
            reset_url: self.mail.reset_url.clone(),
            mail_from: self.mail.from.clone(),
        }
    }
}
