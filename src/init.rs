//! Process-wide initialization: configuration and log output.

use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use docvec_core::config::{self, GlobalConfig, LogConfig, LogLevel};
use docvec_core::Result;

/// Installs `config` for the whole process and starts log output.
///
/// Calling again with an identical configuration is a no-op. A different
/// configuration fails with `FailedPrecondition`.
pub fn init(config: GlobalConfig) -> Result<()> {
    config.validate()?;
    if config::is_installed() {
        config::install(config)?;
        return Ok(());
    }

    let log = config.log.clone().unwrap_or_default();
    let writer = match &log {
        LogConfig::Console { .. } => None,
        LogConfig::File {
            dir,
            basename,
            file_size_mb,
            overdue_days,
            ..
        } => Some(RollingFile::open(dir, basename, *file_size_mb, *overdue_days)?),
    };
    if !config::install(config)? {
        return Ok(());
    }
    install_subscriber(log.level(), writer);
    info!(version = env!("CARGO_PKG_VERSION"), "docvec initialized");
    Ok(())
}

pub(crate) fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error | LogLevel::Fatal => Level::ERROR,
    }
}

fn install_subscriber(level: LogLevel, writer: Option<RollingFile>) {
    let builder = FmtSubscriber::builder().with_max_level(tracing_level(level));
    let installed = match writer {
        None => tracing::subscriber::set_global_default(builder.with_writer(io::stderr).finish()),
        Some(file) => tracing::subscriber::set_global_default(
            builder.with_ansi(false).with_writer(Mutex::new(file)).finish(),
        ),
    };
    if let Err(e) = installed {
        debug!("keeping the existing tracing subscriber: {}", e);
    }
}

/// Append-only log file that is renamed aside once it grows past a size
/// limit. Rolled files older than the retention window are removed.
pub(crate) struct RollingFile {
    dir: PathBuf,
    basename: String,
    max_bytes: u64,
    overdue_days: u32,
    file: File,
    written: u64,
}

impl RollingFile {
    pub(crate) fn open(dir: &Path, basename: &str, file_size_mb: u64, overdue_days: u32) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let file = Self::append(&dir.join(basename))?;
        let written = file.metadata()?.len();
        let rolling = Self {
            dir: dir.to_path_buf(),
            basename: basename.to_string(),
            max_bytes: file_size_mb.saturating_mul(1024 * 1024),
            overdue_days,
            file,
            written,
        };
        rolling.prune();
        Ok(rolling)
    }

    fn append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(&self.basename)
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
        let rolled = self.dir.join(format!("{}.{}", self.basename, stamp));
        fs::rename(self.active_path(), rolled)?;
        self.file = Self::append(&self.active_path())?;
        self.written = 0;
        self.prune();
        Ok(())
    }

    /// Best effort: files that cannot be inspected or removed are skipped.
    fn prune(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(self.overdue_days));
        let prefix = format!("{}.", self.basename);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let modified = entry.metadata().and_then(|m| m.modified());
            if let Ok(modified) = modified {
                if chrono::DateTime::<Utc>::from(modified) <= cutoff {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.roll()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
