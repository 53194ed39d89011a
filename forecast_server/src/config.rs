//! Server configuration from command-line flags and environment variables

use clap::Parser;
use demand_forecast::{RetryPolicy, DEFAULT_HORIZON};
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration; every flag can also be set through the environment
/// (a `.env` file is honoured).
#[derive(Debug, Clone, Parser)]
#[command(name = "forecast_server")]
#[command(about = "Serve the sales demand forecast API and dashboard")]
#[command(version)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Serialized model artifact produced by the training pipeline
    #[arg(long, env = "MODEL_PATH", default_value = "artifacts/model.json")]
    pub model_path: PathBuf,

    /// Forecast cache file, reused across restarts
    #[arg(long, env = "FORECAST_CACHE_PATH", default_value = "artifacts/forecast_cache.json")]
    pub cache_path: PathBuf,

    /// Directory with optional page overrides and a `static/` folder
    #[arg(long, env = "FRONTEND_DIR", default_value = "frontend")]
    pub frontend_dir: PathBuf,

    /// Number of days to forecast
    #[arg(long, env = "FORECAST_HORIZON", default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,

    /// Model fit attempts before giving up
    #[arg(
        long,
        env = "FIT_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub fit_attempts: u32,

    /// Pause between fit attempts, in milliseconds
    #[arg(long, env = "FIT_BACKOFF_MS", default_value_t = 1000)]
    pub fit_backoff_ms: u64,
}

impl ServerConfig {
    /// Address the server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Fit retry policy
    pub fn retry_policy(&self) -> demand_forecast::Result<RetryPolicy> {
        RetryPolicy::new(self.fit_attempts, Duration::from_millis(self.fit_backoff_ms))
    }

    /// Directory served under `/static`
    pub fn static_dir(&self) -> PathBuf {
        self.frontend_dir.join("static")
    }
}
