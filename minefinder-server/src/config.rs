use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// What to do when a second connection registers a username that is
/// already bound to a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateUsernamePolicy {
    /// Keep the first binding and send the newcomer an error.
    #[default]
    Reject,
    /// Last registration wins.
    Replace,
}

impl FromStr for DuplicateUsernamePolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub connection_timeout_seconds: u64,
    pub cleanup_interval_seconds: u64,
    pub duplicate_usernames: DuplicateUsernamePolicy,
    pub rate_limit_burst: u32,
    pub rate_limit_refill_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            connection_timeout_seconds: 300,
            cleanup_interval_seconds: 30,
            duplicate_usernames: DuplicateUsernamePolicy::Reject,
            rate_limit_burst: 30,
            rate_limit_refill_millis: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            connection_timeout_seconds: parse_var(
                &lookup,
                "CONNECTION_TIMEOUT_SECONDS",
                defaults.connection_timeout_seconds,
            )?,
            cleanup_interval_seconds: parse_var(
                &lookup,
                "CLEANUP_INTERVAL_SECONDS",
                defaults.cleanup_interval_seconds,
            )?,
            duplicate_usernames: parse_var(
                &lookup,
                "DUPLICATE_USERNAMES",
                defaults.duplicate_usernames,
            )?,
            rate_limit_burst: parse_var(&lookup, "RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_refill_millis: parse_var(
                &lookup,
                "RATE_LIMIT_REFILL_MILLIS",
                defaults.rate_limit_refill_millis,
            )?,
        })
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        // tokio::time::interval panics on a zero period.
        Duration::from_secs(self.cleanup_interval_seconds.max(1))
    }

    pub fn rate_limit_refill(&self) -> Duration {
        Duration::from_millis(self.rate_limit_refill_millis)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
