//! Command line and environment configuration

use crate::auth::MIN_SECRET_LEN;
use crate::server::ServerConfig;
use anyhow::{bail, Context, Result};
use clap::Parser;
use cofund_workflow::{EngineConfig, StaticRolePermissions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Cofund workflow API server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cofund-server",
    version,
    about = "REST API server for the Cofund approval workflows",
    long_about = None
)]
pub struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "COFUND_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "COFUND_PORT")]
    pub port: u16,

    /// PostgreSQL connection string; the in-memory store is used when unset
    #[arg(long, env = "COFUND_DATABASE_URL")]
    pub database_url: Option<String>,

    /// HS256 secret for bearer tokens
    #[arg(long, env = "COFUND_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// JSON role definitions replacing the built-in roles
    #[arg(long, env = "COFUND_ROLES_FILE")]
    pub roles_file: Option<PathBuf>,

    /// Delivery attempts per notification
    #[arg(long, default_value = "3", env = "COFUND_NOTIFY_MAX_ATTEMPTS")]
    pub notify_max_attempts: u32,

    /// Base delay between notification attempts in milliseconds
    #[arg(long, default_value = "200", env = "COFUND_NOTIFY_BACKOFF_MS")]
    pub notify_backoff_ms: u64,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "COFUND_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Enable JSON logging format
    #[arg(long, env = "COFUND_JSON_LOGS")]
    pub json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl Args {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        if self.notify_max_attempts == 0 {
            bail!("notify-max-attempts must be at least 1");
        }

        Ok(EngineConfig {
            notify_max_attempts: self.notify_max_attempts,
            notify_backoff: Duration::from_millis(self.notify_backoff_ms),
            enable_metrics: true,
        })
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        if self.request_timeout == 0 {
            bail!("request-timeout must be at least 1 second");
        }

        Ok(ServerConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout),
        })
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        match self.jwt_secret.as_deref() {
            None | Some("") => bail!("COFUND_JWT_SECRET is required"),
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                bail!("COFUND_JWT_SECRET must be at least {} characters", MIN_SECRET_LEN)
            }
            Some(secret) => Ok(secret),
        }
    }

    /// Role table from `--roles-file`, or the built-in roles
    pub fn load_roles(&self) -> Result<StaticRolePermissions> {
        match &self.roles_file {
            Some(path) => {
                let roles = StaticRolePermissions::from_file(path)
                    .with_context(|| format!("Failed to load roles from {}", path.display()))?;
                info!(path = %path.display(), roles = roles.role_names().len(), "Loaded role file");
                Ok(roles)
            }
            None => Ok(StaticRolePermissions::with_default_roles()),
        }
    }
}
