//! Rolling File Logger
//!
//! A `tracing-subscriber` fmt layer that writes to `<dir>/<name>.log`,
//! rotates by size and keeps the most recent lines in a circular buffer
//! so the client can show them without touching the disk.
//!
//! `log` records from library crates are bridged through `tracing-log`.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

static LOGGER: OnceLock<RollingWriter> = OnceLock::new();

/// Logger errors
#[derive(Debug)]
pub enum LoggerError {
    Io(io::Error),
    AlreadyInitialized,
    NotInitialized,
}

impl std::fmt::Display for LoggerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggerError::Io(e) => write!(f, "Log file error: {}", e),
            LoggerError::AlreadyInitialized => write!(f, "Logger already initialized"),
            LoggerError::NotInitialized => write!(f, "Logger not initialized"),
        }
    }
}

impl std::error::Error for LoggerError {}

impl From<io::Error> for LoggerError {
    fn from(e: io::Error) -> Self {
        LoggerError::Io(e)
    }
}

/// Tuning knobs for the rolling writer
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Rotate once the active file would grow past this size
    pub max_bytes: u64,
    /// Number of files kept on disk, including the active one
    pub max_files: usize,
    /// Lines kept in memory for `recent_lines`
    pub buffer_lines: usize,
    /// Also write every line to stderr
    pub echo_stderr: bool,
    pub level: log::LevelFilter,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_files: 5,
            buffer_lines: 500,
            echo_stderr: false,
            level: log::LevelFilter::Info,
        }
    }
}

struct RollingState {
    dir: PathBuf,
    base_name: String,
    file: File,
    written: u64,
    options: LoggerOptions,
    recent: VecDeque<String>,
}

impl RollingState {
    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn numbered_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.{}.log", self.base_name, n))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let keep = self.options.max_files.max(1);
        // Shift name.(n).log -> name.(n+1).log, dropping the oldest
        for n in (1..keep).rev() {
            let from = self.numbered_path(n);
            if !from.exists() {
                continue;
            }
            if n + 1 >= keep {
                fs::remove_file(&from)?;
            } else {
                fs::rename(&from, self.numbered_path(n + 1))?;
            }
        }
        if keep > 1 {
            fs::rename(self.active_path(), self.numbered_path(1))?;
        }
        self.file = File::create(self.active_path())?;
        self.written = 0;
        Ok(())
    }

    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.options.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;

        if self.options.echo_stderr {
            let _ = io::stderr().write_all(buf);
        }

        let text = String::from_utf8_lossy(buf);
        for line in text.lines().filter(|l| !l.is_empty()) {
            if self.recent.len() == self.options.buffer_lines {
                self.recent.pop_front();
            }
            if self.options.buffer_lines > 0 {
                self.recent.push_back(line.to_string());
            }
        }
        Ok(())
    }
}

/// Size-rotated log file shared by every writer handle
#[derive(Clone)]
pub struct RollingWriter {
    state: Arc<Mutex<RollingState>>,
}

impl RollingWriter {
    /// Open (or create) `<dir>/<name>.log`, appending to existing content
    pub fn open(dir: &Path, name: &str, options: LoggerOptions) -> Result<Self, LoggerError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            state: Arc::new(Mutex::new(RollingState {
                dir: dir.to_path_buf(),
                base_name: name.to_string(),
                file,
                written,
                recent: VecDeque::with_capacity(options.buffer_lines),
                options,
            })),
        })
    }

    /// Most recent lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        match self.state.lock() {
            Ok(state) => state.recent.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Path of the file currently written to
    pub fn active_path(&self) -> Option<PathBuf> {
        self.state.lock().ok().map(|s| s.active_path())
    }
}

/// Per-event handle handed out to the fmt layer
pub struct RollingHandle {
    state: Arc<Mutex<RollingState>>,
}

impl Write for RollingHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        state.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.state.lock() {
            Ok(mut state) => state.file.flush(),
            Err(_) => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RollingHandle {
            state: self.state.clone(),
        }
    }
}

/// Local wall-clock timestamps, millisecond precision
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn to_tracing_level(level: log::LevelFilter) -> tracing::level_filters::LevelFilter {
    use tracing::level_filters::LevelFilter;
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

/// Initialize the global logger with default options
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LoggerOptions::default())
}

/// Initialize the global logger
///
/// Installs the tracing subscriber (which also captures `log` records).
/// Fails if a global subscriber is already set.
pub fn init_logger_with(
    log_dir: PathBuf,
    app_name: &str,
    options: LoggerOptions,
) -> Result<(), LoggerError> {
    if LOGGER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let level = to_tracing_level(options.level);
    let writer = RollingWriter::open(&log_dir, app_name, options)?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_max_level(level)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    LOGGER
        .set(writer)
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    tracing::info!(app = app_name, dir = %log_dir.display(), "logger initialized");
    Ok(())
}

fn ensure_init() -> Result<(), LoggerError> {
    LOGGER.get().map(|_| ()).ok_or(LoggerError::NotInitialized)
}

pub fn info(msg: &str) -> Result<(), LoggerError> {
    ensure_init()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), LoggerError> {
    ensure_init()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    ensure_init()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// Recent lines of the global logger (empty before init)
pub fn recent_lines() -> Vec<String> {
    LOGGER.get().map(|w| w.recent_lines()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_line(writer: &RollingWriter, line: &str) {
        let mut handle = writer.make_writer();
        handle.write_all(format!("{}\n", line).as_bytes()).unwrap();
    }

    #[test]
    fn test_writes_to_active_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RollingWriter::open(dir.path(), "app", LoggerOptions::default()).unwrap();

        write_line(&writer, "first");
        write_line(&writer, "second");

        let content = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_recent_lines_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoggerOptions {
            buffer_lines: 2,
            ..Default::default()
        };
        let writer = RollingWriter::open(dir.path(), "app", options).unwrap();

        write_line(&writer, "a");
        write_line(&writer, "b");
        write_line(&writer, "c");

        assert_eq!(writer.recent_lines(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_rotation_keeps_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoggerOptions {
            max_bytes: 8,
            max_files: 2,
            ..Default::default()
        };
        let writer = RollingWriter::open(dir.path(), "app", options).unwrap();

        write_line(&writer, "line-1");
        write_line(&writer, "line-2");
        write_line(&writer, "line-3");

        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        let previous = fs::read_to_string(dir.path().join("app.1.log")).unwrap();
        assert_eq!(active, "line-3\n");
        assert_eq!(previous, "line-2\n");
        assert!(!dir.path().join("app.2.log").exists());
    }

    #[test]
    fn test_helpers_require_init() {
        assert!(matches!(info("nope"), Err(LoggerError::NotInitialized)));
    }
}
