use std::{fmt, str::FromStr};

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
    #[error("invalid module config '{}', expected <module>=<level>", _0)]
    InvalidModuleConfig(String),
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

// Override the log level of a single module, written as `<module>=<level>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module: String,
    pub level: LogLevel,
}

impl FromStr for ModuleConfig {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, level) = s
            .split_once('=')
            .ok_or_else(|| LoggerError::InvalidModuleConfig(s.to_owned()))?;

        let module = module.trim();
        if module.is_empty() {
            return Err(LoggerError::InvalidModuleConfig(s.to_owned()));
        }

        let level = LogLevel::from_str(level.trim())
            .map_err(|_| LoggerError::InvalidModuleConfig(s.to_owned()))?;

        Ok(Self {
            module: module.to_owned(),
            level,
        })
    }
}

impl fmt::Display for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.module, self.level)
    }
}

pub fn default_logs_datetime_format() -> String {
    String::from("[%Y-%m-%d] (%H:%M:%S%.3f)")
}

fn default_log_filename() -> String {
    String::from("connex.log")
}

fn default_logs_path() -> String {
    String::from("logs/")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct LogConfig {
    /// Set log level
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value_t))]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[cfg_attr(feature = "clap", clap(long, value_enum))]
    #[serde(default)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the log filename date based
    /// If disabled, the log file will be named connex.log instead of YYYY-MM-DD.connex.log
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_file_log_date_based: bool,
    /// Disable the usage of colors in log
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Log filename
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_log_filename()))]
    #[serde(default = "default_log_filename")]
    pub filename_log: String,
    /// Logs directory
    ///
    /// It must end with a / to be a valid folder.
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_logs_path()))]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Module configuration for logs
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub logs_modules: Vec<ModuleConfig>,
    /// Change the datetime format used by the logger
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_logs_datetime_format()))]
    #[serde(default = "default_logs_datetime_format")]
    pub datetime_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            file_log_level: None,
            disable_file_logging: false,
            disable_file_log_date_based: false,
            disable_log_color: false,
            filename_log: default_log_filename(),
            logs_path: default_logs_path(),
            logs_modules: Vec::new(),
            datetime_format: default_logs_datetime_format(),
        }
    }
}

fn format_dispatch(datetime_format: String, colored: bool) -> fern::Dispatch {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::Magenta);

    fern::Dispatch::new().format(move |out, message, record| {
        let now = chrono::Local::now().format(&datetime_format);
        if colored {
            out.finish(format_args!(
                "{} {} [{}] {}",
                now,
                colors.color(record.level()),
                record.target(),
                message
            ))
        } else {
            out.finish(format_args!(
                "{} {} [{}] {}",
                now,
                record.level(),
                record.target(),
                message
            ))
        }
    })
}

// Build the logger described by the config without installing it
pub fn build_dispatch(config: &LogConfig) -> Result<fern::Dispatch, LoggerError> {
    let mut stdout = format_dispatch(config.datetime_format.clone(), !config.disable_log_color)
        .level(config.log_level.into());
    for module in config.logs_modules.iter() {
        stdout = stdout.level_for(module.module.clone(), module.level.into());
    }
    let stdout = stdout.chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new().chain(stdout);
    if !config.disable_file_logging {
        std::fs::create_dir_all(&config.logs_path)?;

        let level = config.file_log_level.unwrap_or(config.log_level);
        let file = format_dispatch(config.datetime_format.clone(), false).level(level.into());
        let file = if config.disable_file_log_date_based {
            file.chain(fern::log_file(format!(
                "{}{}",
                config.logs_path, config.filename_log
            ))?)
        } else {
            file.chain(fern::DateBased::new(
                &config.logs_path,
                format!("%Y-%m-%d.{}", config.filename_log),
            ))
        };
        dispatch = dispatch.chain(file);
    }

    Ok(dispatch)
}

// Install the global logger, can only be done once per process
pub fn setup_logger(config: &LogConfig) -> Result<(), LoggerError> {
    build_dispatch(config)?.apply()?;
    Ok(())
}
