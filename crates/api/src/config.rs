use std::str::FromStr;
use std::time::Duration;

/// Configuration value that could not be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Pause between simulator ticks (default: 5 s).
    pub telemetry_interval: Duration,
    /// Run the telemetry simulator (default: `true`).
    pub simulator_enabled: bool,
    /// Outbound queue depth per WebSocket connection (default: `64`).
    pub ws_subscriber_buffer: usize,
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `10`                    |
    /// | `TELEMETRY_INTERVAL_SECS`     | `5`                     |
    /// | `TELEMETRY_SIMULATOR_ENABLED` | `true`                  |
    /// | `WS_SUBSCRIBER_BUFFER`        | `64`                    |
    /// | `DATABASE_URL`                | unset                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port: u16 = parse_var(&lookup, "PORT", 3000, "a valid port number")?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 =
            parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30, "a whole number of seconds")?;

        let shutdown_timeout_secs: u64 =
            parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS", 10, "a whole number of seconds")?;

        let interval_secs: u64 =
            parse_var(&lookup, "TELEMETRY_INTERVAL_SECS", 5, "a positive number of seconds")?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TELEMETRY_INTERVAL_SECS",
                expected: "a positive number of seconds",
                value: "0".into(),
            });
        }

        let simulator_enabled = match lookup("TELEMETRY_SIMULATOR_ENABLED") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: "TELEMETRY_SIMULATOR_ENABLED",
                expected: "true or false",
                value: raw,
            })?,
        };

        let ws_subscriber_buffer: usize =
            parse_var(&lookup, "WS_SUBSCRIBER_BUFFER", 64, "a positive integer")?;
        if ws_subscriber_buffer == 0 {
            return Err(ConfigError::Invalid {
                var: "WS_SUBSCRIBER_BUFFER",
                expected: "a positive integer",
                value: "0".into(),
            });
        }

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            telemetry_interval: Duration::from_secs(interval_secs),
            simulator_enabled,
            ws_subscriber_buffer,
            database_url,
        })
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn parse_var<T, F>(
    lookup: &F,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value: raw,
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
