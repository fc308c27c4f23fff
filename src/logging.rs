use crate::config::{ensure_logs_dir, get_logs_dir};
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, Once};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// One line of a component log file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_LOG_BACKUPS: u32 = 5;

static LOGGER_INITIALIZED: Once = Once::new();

// Keep the guard alive for the lifetime of the program
static FILE_APPENDER_GUARD: LazyLock<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    LazyLock::new(|| Mutex::new(None));

pub fn init_logging() -> Result<()> {
    let logs_dir = ensure_logs_dir()?;

    LOGGER_INITIALIZED.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_filter(env_filter.clone());

        let file_appender = tracing_appender::rolling::never(&logs_dir, "app.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if let Ok(mut guard_mutex) = FILE_APPENDER_GUARD.lock() {
            *guard_mutex = Some(guard);
        }

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter);

        // try_init: tests may already have installed a subscriber
        let _ = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init();
    });

    Ok(())
}

/// Severity of a component log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Emit through tracing, then append a JSON line to `<logs>/<component>.log`
pub fn log_component_event(
    component: &str,
    level: LogLevel,
    message: &str,
    details: Option<serde_json::Value>,
) -> Result<()> {
    match level {
        LogLevel::Error => error!(component, "{}", message),
        LogLevel::Warn => warn!(component, "{}", message),
        LogLevel::Debug => debug!(component, "{}", message),
        LogLevel::Info => info!(component, "{}", message),
    }

    let entry = LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        level,
        component: component.to_string(),
        message: message.to_string(),
        details,
    };
    write_log_entry(&component_log_path(&ensure_logs_dir()?, component), &entry)
}

/// Component names become file names; anything outside `[A-Za-z0-9_-]` is replaced
fn component_log_path(logs_dir: &Path, component: &str) -> PathBuf {
    let name: String = component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    logs_dir.join(format!("{}.log", name))
}

fn write_log_entry(log_file_path: &Path, entry: &LogEntry) -> Result<()> {
    if should_rotate_log(log_file_path)? {
        rotate_log_file(log_file_path)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let json_line = serde_json::to_string(entry)?;
    writeln!(file, "{}", json_line)?;
    file.flush()?;

    Ok(())
}

fn should_rotate_log(log_file_path: &Path) -> Result<bool> {
    if !log_file_path.exists() {
        return Ok(false);
    }

    Ok(std::fs::metadata(log_file_path)?.len() > MAX_LOG_SIZE)
}

fn rotate_log_file(log_file_path: &Path) -> Result<()> {
    // 4 -> 5, 3 -> 4, ...
    for i in (1..MAX_LOG_BACKUPS).rev() {
        let current_backup = log_file_path.with_extension(format!("log.{}", i));
        let next_backup = log_file_path.with_extension(format!("log.{}", i + 1));

        if current_backup.exists() {
            std::fs::rename(&current_backup, &next_backup)?;
        }
    }

    if log_file_path.exists() {
        std::fs::rename(log_file_path, log_file_path.with_extension("log.1"))?;
    }

    Ok(())
}

/// Read a component log, newest entries first
pub fn read_component_logs(component: &str, max_lines: Option<usize>) -> Result<Vec<LogEntry>> {
    read_log_file(&component_log_path(&get_logs_dir()?, component), max_lines)
}

fn read_log_file(log_file_path: &Path, max_lines: Option<usize>) -> Result<Vec<LogEntry>> {
    if !log_file_path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(log_file_path)?);
    let mut entries: Vec<LogEntry> = reader
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();

    entries.reverse();

    if let Some(max) = max_lines {
        entries.truncate(max);
    }

    Ok(entries)
}

/// Mask a credential for display: keep the first four characters
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

pub fn log_debug(component: &str, message: &str) -> Result<()> {
    log_component_event(component, LogLevel::Debug, message, None)
}

pub fn log_info(component: &str, message: &str) -> Result<()> {
    log_component_event(component, LogLevel::Info, message, None)
}

pub fn log_warn(component: &str, message: &str) -> Result<()> {
    log_component_event(component, LogLevel::Warn, message, None)
}

pub fn log_error(component: &str, message: &str) -> Result<()> {
    log_component_event(component, LogLevel::Error, message, None)
}
