use std::env;

use super::parse_var;
use crate::core::Result;

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Seconds in-flight requests (bulk syncs included) get to finish on shutdown
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        // Gateway round-trips dominate request time
        let workers = std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(4);

        Self {
            host,
            port,
            workers,
            shutdown_timeout_secs: 30,
        }
    }

    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let mut config = Self::new(host, parse_var("SERVER_PORT", 8080)?);

        config.workers = parse_var("SERVER_WORKERS", config.workers)?.max(1);
        config.shutdown_timeout_secs =
            parse_var("SERVER_SHUTDOWN_TIMEOUT_SECS", config.shutdown_timeout_secs)?;

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
