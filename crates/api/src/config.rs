use std::str::FromStr;
use std::time::Duration;

use toonify_comic::RetryPolicy;

/// Longest upstream timeout accepted from configuration.
const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 600;

/// Startup-time configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// Everything except `COMIC_API_URL` has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Inbound HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks and in-flight jobs, in
    /// seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Endpoint of the comic-generation service.
    pub comic_api_url: String,
    /// Hard limit on one upstream request (default: 300s).
    pub upstream_timeout: Duration,
    /// Age after which a job is forgotten regardless of status (default: 600s).
    pub job_retention: Duration,
    /// Period of the background sweep. `None` leaves only the per-poll sweep.
    pub sweep_interval: Option<Duration>,
    /// Retry policy for upstream calls. Disabled by default.
    pub retry: RetryPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `COMIC_API_URL`           | required                 |
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `PORT`                    | `3000`                   |
    /// | `CORS_ORIGINS`            | `http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                     |
    /// | `UPSTREAM_TIMEOUT_SECS`   | `300` (1..=600)          |
    /// | `JOB_RETENTION_SECS`      | `600`                    |
    /// | `JOB_SWEEP_INTERVAL_SECS` | `60` (`0` disables)      |
    /// | `UPSTREAM_MAX_ATTEMPTS`   | `1` (no retry)           |
    /// | `UPSTREAM_RETRY_DELAY_MS` | `1000` (capped at 30s)   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?;

        let comic_api_url = lookup("COMIC_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("COMIC_API_URL"))?;

        let upstream_timeout_secs: u64 = parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 300)?;
        if !(1..=MAX_UPSTREAM_TIMEOUT_SECS).contains(&upstream_timeout_secs) {
            return Err(ConfigError::Invalid {
                name: "UPSTREAM_TIMEOUT_SECS",
                value: upstream_timeout_secs.to_string(),
                reason: format!("must be between 1 and {MAX_UPSTREAM_TIMEOUT_SECS}"),
            });
        }

        let job_retention_secs: u64 = parse_or(&lookup, "JOB_RETENTION_SECS", 600)?;
        if job_retention_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "JOB_RETENTION_SECS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let sweep_interval_secs: u64 = parse_or(&lookup, "JOB_SWEEP_INTERVAL_SECS", 60)?;

        let max_attempts: u32 = parse_or(&lookup, "UPSTREAM_MAX_ATTEMPTS", 1)?;
        let retry_delay_ms: u64 = parse_or(&lookup, "UPSTREAM_RETRY_DELAY_MS", 1000)?;
        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(retry_delay_ms).min(defaults.max_delay),
            ..defaults
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            comic_api_url,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            job_retention: Duration::from_secs(job_retention_secs),
            sweep_interval: (sweep_interval_secs > 0)
                .then(|| Duration::from_secs(sweep_interval_secs)),
            retry,
        })
    }

    /// Hard deadline for one job: every attempt plus every backoff.
    pub fn job_deadline(&self) -> Duration {
        self.retry.worst_case(self.upstream_timeout)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
