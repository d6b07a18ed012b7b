//! Process configuration read from environment variables.

use crate::error::ControllerError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Runtime settings for the Change Tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Events older than this many days are deleted
    pub retention_days: u32,
    /// Slack incoming webhook; notifications are disabled when unset
    pub slack_webhook_url: Option<String>,
    /// Periodic full resync of every subscription
    pub resync_interval: Duration,
    /// Grace period for stopping the watch loops
    pub shutdown_timeout: Duration,
    /// Bound on each outbound notification request
    pub notify_timeout: Duration,
    /// Interval between retention cleanups
    pub cleanup_interval: Duration,
    /// Freshness window of the cached stats aggregate
    pub stats_cache_ttl: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./events.db"),
            retention_days: 60,
            slack_webhook_url: None,
            resync_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(24 * 60 * 60),
            stats_cache_ttl: Duration::from_secs(10),
        }
    }
}

impl TrackerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, applying defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let slack_webhook_url = lookup("SLACK_WEBHOOK_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            db_path,
            retention_days: parse_or(&lookup, "RETENTION_DAYS", defaults.retention_days)?,
            slack_webhook_url,
            resync_interval: seconds_or(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval,
            )?,
            shutdown_timeout: seconds_or(
                &lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout,
            )?,
            notify_timeout: seconds_or(&lookup, "NOTIFY_TIMEOUT_SECS", defaults.notify_timeout)?,
            cleanup_interval: seconds_or(
                &lookup,
                "CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval,
            )?,
            stats_cache_ttl: seconds_or(&lookup, "STATS_CACHE_TTL_SECS", defaults.stats_cache_ttl)?,
        })
    }

    /// Logs the effective configuration. The webhook URL is a credential and
    /// is reported only as enabled/disabled.
    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  Database: {}", self.db_path.display());
        info!("  Retention: {} days", self.retention_days);
        info!(
            "  Slack notifications: {}",
            if self.slack_webhook_url.is_some() { "enabled" } else { "disabled" }
        );
        info!("  Resync interval: {:?}", self.resync_interval);
        info!("  Cleanup interval: {:?}", self.cleanup_interval);
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ControllerError::InvalidConfig(format!(
                "{} must be a non-negative integer, got '{}'",
                key, raw
            ))
        }),
    }
}

/// Parses a whole number of seconds; zero is rejected.
fn seconds_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(ControllerError::InvalidConfig(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = TrackerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.retention_days, 60);
        assert_eq!(config.resync_interval, Duration::from_secs(30));
        assert!(config.slack_webhook_url.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = TrackerConfig::from_lookup(lookup_from(&[
            ("DB_PATH", "/data/events.db"),
            ("RETENTION_DAYS", "7"),
            ("SLACK_WEBHOOK_URL", " https://hooks.slack.com/services/T/B/X "),
            ("RESYNC_INTERVAL_SECS", "45"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/data/events.db"));
        assert_eq!(config.retention_days, 7);
        assert_eq!(
            config.slack_webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
        assert_eq!(config.resync_interval, Duration::from_secs(45));
    }

    #[test]
    fn test_blank_webhook_disables_notifications() {
        let config =
            TrackerConfig::from_lookup(lookup_from(&[("SLACK_WEBHOOK_URL", "  ")])).unwrap();
        assert!(config.slack_webhook_url.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_number = TrackerConfig::from_lookup(lookup_from(&[("RETENTION_DAYS", "sixty")]));
        assert!(matches!(bad_number, Err(ControllerError::InvalidConfig(_))));

        let zero_interval =
            TrackerConfig::from_lookup(lookup_from(&[("RESYNC_INTERVAL_SECS", "0")]));
        assert!(matches!(zero_interval, Err(ControllerError::InvalidConfig(_))));
    }
}
