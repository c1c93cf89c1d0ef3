//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::ClientIpHeader;
use crate::db::{Database, NewUser, UserRole};
use crate::jwt::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS};
use crate::password;
use crate::rate_limit::{DEFAULT_AUTH_RATE_LIMIT_PER_MINUTE, RateLimitConfig};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Inkpost", about = "Blog and todo REST backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "inkpost.db")]
    pub database: String,

    /// Deployment environment name, reported by /health
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub env: String,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TOKEN_TTL_SECS)]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_TOKEN_TTL_SECS)]
    pub refresh_token_ttl: u64,

    /// Login and registration attempts allowed per minute per client IP
    #[arg(long, default_value_t = DEFAULT_AUTH_RATE_LIMIT_PER_MINUTE)]
    pub auth_rate_limit: u32,

    /// Read the client IP for rate limiting from this proxy header. Only set
    /// this behind a reverse proxy that overwrites or appends it; by default
    /// the socket address is used
    #[arg(long, env = "IP_HEADER", value_enum)]
    pub ip_header: Option<ClientIpHeader>,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET instead
    #[arg(long)]
    pub access_token_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET instead
    #[arg(long)]
    pub refresh_token_secret_file: Option<String>,

    /// Create (or promote) an admin with this email on startup. Password from ADMIN_PASSWORD
    #[arg(long, value_name = "EMAIL")]
    pub create_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format. Filtering follows
/// `RUST_LOG`, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Read an environment variable and remove it from the environment.
fn take_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var(name) };
    Some(value)
}

/// Load one signing secret from `env_var` or `file`.
/// Returns None and logs an error if the secret cannot be loaded.
fn load_secret(env_var: &str, file: Option<&str>, flag: &str) -> Option<String> {
    let secret = if let Some(secret) = take_env(env_var) {
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read {} file", env_var);
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use {}",
            env_var, flag
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the access and refresh token secrets. They must differ.
pub fn load_token_secrets(
    access_file: Option<&str>,
    refresh_file: Option<&str>,
) -> Option<(String, String)> {
    let access = load_secret(
        "ACCESS_TOKEN_SECRET",
        access_file,
        "--access-token-secret-file",
    )?;
    let refresh = load_secret(
        "REFRESH_TOKEN_SECRET",
        refresh_file,
        "--refresh-token-secret-file",
    )?;

    if access == refresh {
        error!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must be different");
        return None;
    }

    Some((access, refresh))
}

/// Handle the --create-admin flag: create an admin with ADMIN_PASSWORD, or
/// promote the existing user with that email.
pub async fn handle_create_admin(db: &Database, email: &str) {
    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            if let Err(e) = db.users().set_role(existing.id, UserRole::Admin).await {
                error!(error = %e, "Failed to promote user to admin");
                std::process::exit(1);
            }
            if !existing.is_active {
                if let Err(e) = db.users().set_active(existing.id, true).await {
                    error!(error = %e, "Failed to reactivate admin user");
                    std::process::exit(1);
                }
            }
            info!(email = %email, user_id = existing.id, "Existing user promoted to admin");
        }
        Ok(None) => {
            let Some(password) = take_env("ADMIN_PASSWORD").filter(|p| !p.is_empty()) else {
                error!("ADMIN_PASSWORD is required to create a new admin user");
                std::process::exit(1);
            };

            let password_hash = match password::hash_password(&password).await {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            let new_user = NewUser {
                email,
                password_hash: &password_hash,
                name: "Administrator",
                role: UserRole::Admin,
            };
            match db.users().create(&new_user).await {
                Ok(user) => info!(email = %email, user_id = user.id, "Admin user created"),
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_secret: String,
    refresh_secret: String,
    args: &Args,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        access_token_ttl: args.access_token_ttl,
        refresh_token_ttl: args.refresh_token_ttl,
        environment: args.env.clone(),
        rate_limit: Arc::new(RateLimitConfig::new(args.auth_rate_limit, args.ip_header)),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
