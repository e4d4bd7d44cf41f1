//! `amcd`: the AMC dashboard server binary.
//!
//! Usage:
//!   amcd -c <context-name-or-path> [--listen <addr>]
//!   amcd hash-password
//!   amcd init-config -o <path> --data-dir <dir> --admin-email <email>
//!
//! The context name resolves to `/etc/amc/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use amc_core::Module;
use amc_sql::{SQLStore, SqliteStore};
use config::{AdminConfig, JwtConfig, MailConfig, ServerConfig, ServerSection, StorageConfig};

/// AMC dashboard server.
#[derive(Parser, Debug)]
#[command(name = "amcd", about = "AMC dashboard server", version)]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<String>,

    /// Listen address (overrides `[server].listen`).
    #[arg(long = "listen")]
    listen: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prompt for a password and print its argon2 hash.
    HashPassword,
    /// Write a fresh config with a random JWT secret.
    InitConfig {
        /// Output file.
        #[arg(short = 'o', long)]
        output: PathBuf,
        /// Directory for the SQLite database.
        #[arg(long, default_value = "/var/lib/amc")]
        data_dir: String,
        /// Email of the bootstrap admin account.
        #[arg(long)]
        admin_email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::HashPassword) => {
            let password = prompt_new_password()?;
            println!("{}", hash(&password)?);
            Ok(())
        }
        Some(Command::InitConfig { output, data_dir, admin_email }) => {
            init_config(&output, data_dir, admin_email)
        }
        None => {
            let Some(name) = cli.config.as_deref() else {
                anyhow::bail!("missing -c <context>; see `amcd --help`");
            };
            serve(name, cli.listen).await
        }
    }
}

async fn serve(name: &str, listen: Option<String>) -> anyhow::Result<()> {
    // Load server configuration.
    let config_path = ServerConfig::resolve_path(name);
    let server_config = ServerConfig::load(&config_path)?;

    // Initialize logging. RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| server_config.server.log_level.as_str().into()),
        )
        .init();
    info!("Loaded configuration from {}", config_path.display());

    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = amc_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: listen.unwrap_or_else(|| server_config.server.listen.clone()),
        ..Default::default()
    };

    let sqlite_path = core_config.resolve_sqlite_path();
    let sql: Arc<dyn SQLStore> = Arc::new(
        SqliteStore::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    info!("SQLite database at {}", sqlite_path.display());

    let auth_module = auth::AuthModule::new(Arc::clone(&sql), server_config.auth_config())?;
    bootstrap::ensure_admin(auth_module.service(), &server_config)?;
    info!("Auth module initialized");

    let contracts_module = contracts::ContractsModule::new(Arc::clone(&sql))?;
    info!("Contracts module initialized");

    let modules: [&dyn Module; 2] = [&auth_module, &contracts_module];
    let app = routes::build_router(auth_module.service().clone(), &modules);

    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("AMC server listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;
    info!("AMC server stopped");

    Ok(())
}

fn init_config(output: &std::path::Path, data_dir: String, admin_email: String) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    let password = prompt_new_password()?;

    let jwt_secret: String = {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..32).map(|_| format!("{:02x}", rng.r#gen::<u8>())).collect()
    };

    let config = ServerConfig {
        server: ServerSection::default(),
        storage: StorageConfig { data_dir },
        jwt: JwtConfig { secret: jwt_secret, expire_secs: 86400 },
        admin: Some(AdminConfig {
            email: admin_email,
            name: "Administrator".into(),
            password_hash: hash(&password)?,
        }),
        mail: MailConfig::default(),
    };
    bootstrap::verify_config(&config)?;
    config.save(output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn prompt_new_password() -> anyhow::Result<String> {
    let pw = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if pw != confirm {
        anyhow::bail!("Passwords do not match.");
    }
    if pw.len() < 8 {
        anyhow::bail!("Password must be at least 8 characters.");
    }
    Ok(pw)
}

fn hash(password: &str) -> anyhow::Result<String> {
    auth::service::password::hash_password(password)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}
