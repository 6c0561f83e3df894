//! Process-wide configuration.
//!
//! The configuration is installed at most once per process. Installing an
//! identical value again is accepted; installing a different one is refused,
//! since engines may already have sized pools and limits from the first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::{Error, Result};

pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_LOG_BASENAME: &str = "docvec.log";
pub const DEFAULT_LOG_FILE_SIZE_MB: u64 = 2048;
pub const DEFAULT_LOG_OVERDUE_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            other => Err(Error::InvalidArgument(format!("unknown log level `{}`", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogConfig {
    Console {
        level: LogLevel,
    },
    File {
        level: LogLevel,
        dir: PathBuf,
        basename: String,
        /// Size at which the active file is rolled aside.
        file_size_mb: u64,
        /// Rolled files older than this are removed.
        overdue_days: u32,
    },
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::Console {
            level: LogLevel::default(),
        }
    }
}

impl LogConfig {
    pub fn console(level: LogLevel) -> Self {
        LogConfig::Console { level }
    }

    pub fn file(level: LogLevel) -> Self {
        LogConfig::File {
            level,
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            basename: DEFAULT_LOG_BASENAME.to_string(),
            file_size_mb: DEFAULT_LOG_FILE_SIZE_MB,
            overdue_days: DEFAULT_LOG_OVERDUE_DAYS,
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            LogConfig::Console { level } | LogConfig::File { level, .. } => *level,
        }
    }

    fn validate(&self) -> Result<()> {
        if let LogConfig::File {
            basename,
            file_size_mb,
            ..
        } = self
        {
            if basename.trim().is_empty() {
                return Err(Error::InvalidArgument("log basename must not be empty".into()));
            }
            if *file_size_mb == 0 {
                return Err(Error::InvalidArgument("log file size must be positive".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub memory_limit_bytes: Option<u64>,
    pub query_thread_count: Option<u32>,
    pub optimize_thread_count: Option<u32>,
    pub invert_to_forward_scan_ratio: Option<f32>,
    pub brute_force_by_keys_ratio: Option<f32>,
    pub log: Option<LogConfig>,
}

impl GlobalConfig {
    #[must_use]
    pub fn with_memory_limit_mb(mut self, mb: u64) -> Self {
        self.memory_limit_bytes = Some(mb.saturating_mul(1024 * 1024));
        self
    }

    #[must_use]
    pub fn with_query_threads(mut self, n: u32) -> Self {
        self.query_thread_count = Some(n);
        self
    }

    #[must_use]
    pub fn with_optimize_threads(mut self, n: u32) -> Self {
        self.optimize_thread_count = Some(n);
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = Some(log);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [
            ("invert_to_forward_scan_ratio", self.invert_to_forward_scan_ratio),
            ("brute_force_by_keys_ratio", self.brute_force_by_keys_ratio),
        ] {
            if let Some(r) = ratio {
                if !(0.0..=1.0).contains(&r) {
                    return Err(Error::InvalidArgument(format!(
                        "{} must be within [0, 1], got {}",
                        name, r
                    )));
                }
            }
        }
        if self.query_thread_count == Some(0) || self.optimize_thread_count == Some(0) {
            return Err(Error::InvalidArgument("thread counts must be positive".into()));
        }
        if self.memory_limit_bytes == Some(0) {
            return Err(Error::InvalidArgument("memory limit must be positive".into()));
        }
        if let Some(log) = &self.log {
            log.validate()?;
        }
        Ok(())
    }
}

static GLOBAL: OnceLock<GlobalConfig> = OnceLock::new();

/// Installs `config` as the process-wide configuration.
///
/// Returns `Ok(true)` on first install and `Ok(false)` when an identical
/// configuration is already in place.
pub fn install(config: GlobalConfig) -> Result<bool> {
    config.validate()?;
    let mut fresh = false;
    let current = GLOBAL.get_or_init(|| {
        fresh = true;
        config.clone()
    });
    if fresh {
        return Ok(true);
    }
    if *current == config {
        Ok(false)
    } else {
        Err(Error::FailedPrecondition(
            "global configuration is already initialized with different values".into(),
        ))
    }
}

/// The installed configuration, or defaults when none was installed.
pub fn global() -> GlobalConfig {
    GLOBAL.get().cloned().unwrap_or_default()
}

pub fn is_installed() -> bool {
    GLOBAL.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_defaults() {
        let LogConfig::File {
            level,
            dir,
            basename,
            file_size_mb,
            overdue_days,
        } = LogConfig::file(LogLevel::Info)
        else {
            panic!("expected file config");
        };
        assert_eq!(level, LogLevel::Info);
        assert_eq!(dir, PathBuf::from("./logs"));
        assert_eq!(basename, "docvec.log");
        assert_eq!((file_size_mb, overdue_days), (2048, 7));
        assert_eq!(LogConfig::default().level(), LogLevel::Warn);
    }

    #[test]
    fn test_ratio_bounds() {
        let mut cfg = GlobalConfig::default();
        cfg.invert_to_forward_scan_ratio = Some(1.5);
        assert!(matches!(cfg.validate(), Err(Error::InvalidArgument(_))));
        cfg.invert_to_forward_scan_ratio = Some(0.9);
        cfg.brute_force_by_keys_ratio = Some(-0.1);
        assert!(cfg.validate().is_err());
        cfg.brute_force_by_keys_ratio = Some(0.1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_memory_limit_mb() {
        let cfg = GlobalConfig::default().with_memory_limit_mb(2);
        assert_eq!(cfg.memory_limit_bytes, Some(2 * 1024 * 1024));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_install_once() {
        let cfg = GlobalConfig::default().with_query_threads(3);
        assert!(install(cfg.clone()).unwrap());
        assert!(!install(cfg.clone()).unwrap());
        assert!(matches!(
            install(GlobalConfig::default().with_query_threads(4)),
            Err(Error::FailedPrecondition(_))
        ));
        assert_eq!(global(), cfg);
    }
}
