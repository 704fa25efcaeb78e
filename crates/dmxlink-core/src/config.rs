//! Manager and socket configuration.
//!
//! Values come from defaults, then environment variables, then whatever the
//! caller sets explicitly (the CLI applies its flags last).

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Overrides the daemon socket path.
pub const SOCKET_ENV: &str = "DMXLINK_SOCKET";
/// Overrides the retry interval, in milliseconds.
pub const RETRY_MS_ENV: &str = "DMXLINK_RETRY_MS";

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default daemon socket path: `~/.dmxlink/daemon.sock`.
pub fn default_socket_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dmxlink")
        .join("daemon.sock")
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).to_string())
}

/// Settings for the connection manager itself.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    pub retry: RetryPolicy,
}

impl ManagerConfig {
    /// Defaults, with `DMXLINK_RETRY_MS` applied when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(RETRY_MS_ENV) {
            config.retry = RetryPolicy::fixed(parse_retry_ms(&raw)?);
        }
        Ok(config)
    }
}

/// Parse a retry interval given in milliseconds.
pub fn parse_retry_ms(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidEnv {
            name: RETRY_MS_ENV,
            value: raw.to_string(),
        }),
    }
}

/// Where and how to reach the daemon socket.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub path: PathBuf,
    pub write_timeout: Duration,
}

impl SocketConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Default path, with `DMXLINK_SOCKET` applied when set.
    pub fn from_env() -> Self {
        match std::env::var(SOCKET_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::new(expand_path(raw.trim())),
            _ => Self::new(default_socket_path()),
        }
    }

    /// Checks that can fail before the daemon is ever contacted.
    ///
    /// A missing socket *file* is fine (the daemon may not be up yet), but the
    /// directory it lives in has to exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptySocketPath);
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(ConfigError::MissingSocketDir(
                parent.to_string_lossy().to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self::new(default_socket_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_path() {
        let path = default_socket_path();
        assert!(path.ends_with(".dmxlink/daemon.sock"));
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_path("~/x.sock");
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("x.sock"));
    }

    #[test]
    fn test_parse_retry_ms() {
        assert_eq!(parse_retry_ms("250").unwrap(), Duration::from_millis(250));
        assert!(parse_retry_ms("0").is_err());
        assert!(parse_retry_ms("soon").is_err());
    }

    #[test]
    fn test_validate_accepts_missing_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SocketConfig::new(dir.path().join("daemon.sock"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = SocketConfig::new(dir.path().join("nope").join("daemon.sock"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSocketDir(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_and_zero_timeout() {
        assert!(matches!(
            SocketConfig::new("").validate(),
            Err(ConfigError::EmptySocketPath)
        ));

        let dir = tempfile::tempdir().unwrap();
        let mut config = SocketConfig::new(dir.path().join("daemon.sock"));
        config.write_timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }
}
