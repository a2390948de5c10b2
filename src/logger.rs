use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

static RELAY_LOGGER: Lazy<RelayLogger> = Lazy::new(|| RelayLogger {
    config: RwLock::new(LoggerConfig::default()),
});
static INSTALLED: AtomicBool = AtomicBool::new(false);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::from_env())
}

/// Install the logger, or reconfigure it if it is already installed.
pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let level = config.min_level;
    if let Ok(mut current) = RELAY_LOGGER.config.write() {
        *current = config;
    }

    if !INSTALLED.swap(true, Ordering::SeqCst) {
        if let Err(e) = log::set_logger(&*RELAY_LOGGER) {
            INSTALLED.store(false, Ordering::SeqCst);
            return Err(format!("Failed to set logger: {:?}", e));
        }
    }

    log::set_max_level(level);
    Ok(())
}

/// Console output is for people at a terminal; JSON lines are for collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Console,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub format: LogFormat,
    pub colors: bool,
    pub show_location: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            format: LogFormat::Console,
            colors: true,
            show_location: false,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LOG_LEVEL` (off, error..trace), `LOG_FORMAT=json`, and `NO_COLOR`.
    pub fn from_env() -> Self {
        let json = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let mut config = if json { Self::json() } else { Self::console() };
        if let Some(level) = env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        {
            config.min_level = level;
        }
        if env::var_os("NO_COLOR").is_some() {
            config.colors = false;
        }
        config
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    pub fn json() -> Self {
        Self {
            format: LogFormat::Json,
            colors: false,
            ..Default::default()
        }
    }

    pub fn console() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_location: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: DateTime<Utc>,
    level: &'a str,
    target: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

fn level_badge(level: Level) -> (&'static str, Color) {
    match level {
        Level::Error => ("❌", Color::Red),
        Level::Warn => ("⚠️", Color::Yellow),
        Level::Info => ("💡", Color::Green),
        Level::Debug => ("🐛", Color::Blue),
        Level::Trace => ("🔍", Color::Cyan),
    }
}

struct RelayLogger {
    config: RwLock<LoggerConfig>,
}

impl RelayLogger {
    fn render(record: &Record, config: &LoggerConfig) -> String {
        let location = config
            .show_location
            .then(|| format!("{}:{}", record.file().unwrap_or("?"), record.line().unwrap_or(0)));
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: record.level().as_str(),
            target: record.target(),
            message: record.args().to_string(),
            location,
        };

        match config.format {
            LogFormat::Json => serde_json::to_string(&entry).unwrap_or_default(),
            LogFormat::Console => Self::console_line(&entry, record.level(), config.colors),
        }
    }

    fn console_line(entry: &LogEntry, level: Level, colors: bool) -> String {
        let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let location = entry.location.as_deref().map(|l| format!(" ({})", l));
        if !colors {
            return format!(
                "{} [{}] {}: {}{}",
                timestamp,
                entry.level,
                entry.target,
                entry.message,
                location.unwrap_or_default()
            );
        }

        let (emoji, color) = level_badge(level);
        format!(
            "{} [{}] {}: {}{}",
            timestamp.bright_black(),
            format!("{} {}", emoji, entry.level).color(color).bold(),
            entry.target.bright_blue(),
            entry.message,
            location.unwrap_or_default().bright_black()
        )
    }
}

impl log::Log for RelayLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.read() {
            Ok(config) => metadata.level() <= config.min_level,
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        let line = match self.config.read() {
            Ok(config) if record.level() <= config.min_level => Self::render(record, &config),
            _ => return,
        };
        let _ = writeln!(io::stdout().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Measures one upstream call; logs its duration when stopped or dropped.
pub struct Timer {
    start: Instant,
    name: String,
    stopped: bool,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  {} started", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        let duration = self.elapsed();
        log::debug!("⏱️  {} finished in {}ms", self.name, duration.as_millis());
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            log::debug!("⏱️  {} abandoned after {}ms", self.name, self.elapsed().as_millis());
        }
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, host: &str, port: u16) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Relay will listen on http://{}:{}", host, port);
}

pub fn log_config_info(config: &crate::config::Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Port: {}", config.port_or_default());
    log::info!("   Demo mode: {}", if config.demo_mode { "✅" } else { "❌" });
    log::info!("   OpenAI base: {}", config.openai.api_base);
    match config.openai.key_fingerprint() {
        Some(fp) => log::info!("   OpenAI key: ✅ {}", fp),
        None => log::info!("   OpenAI key: ❌"),
    }
    log::info!("   Upstream timeout: {}s", config.openai.timeout.as_secs());
    log::info!("   Max retries: {}", config.openai.max_retries);
    log::info!("   Max image size: {}", config.limits.max_image_mb());
    log::info!("   Max component images: {}", config.limits.max_component_images);
}
