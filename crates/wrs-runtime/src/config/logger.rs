use core::fmt::Display;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Configuration for logging, parameterized by a log level type.
///
/// Note that you can use multiple outputs at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional forwarding to the `log` crate at the given level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Verbosity of the dispatch logger.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DispatchLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Each dispatch is logged with its cube count.
    #[serde(rename = "basic")]
    Basic,

    /// Each dispatch is timed, and a summary is logged when the client is dropped.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for DispatchLogLevel {}

/// Writes messages to every output of a [LoggerConfig].
#[derive(Debug, Default)]
pub struct Logger {
    loggers: Vec<LoggerKind>,
}

impl Logger {
    /// Creates a logger with the outputs of the given configuration.
    ///
    /// A log file that can't be opened is skipped with a warning.
    pub fn new<L: LogLevel>(config: &LoggerConfig<L>) -> Self {
        let mut loggers = Vec::new();

        if let Some(file) = &config.file {
            match FileLogger::new(file, config.append) {
                Ok(logger) => loggers.push(LoggerKind::File(logger)),
                Err(err) => log::warn!("Unable to open log file {}: {err}", file.display()),
            }
        }

        if config.stdout {
            loggers.push(LoggerKind::Stdout);
        }

        if config.stderr {
            loggers.push(LoggerKind::Stderr);
        }

        if let Some(level) = config.log {
            loggers.push(LoggerKind::Log(level));
        }

        Self { loggers }
    }

    /// If the logger has no output.
    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    /// Logs a message to every output.
    pub fn log<S: Display>(&mut self, msg: &S) {
        for logger in self.loggers.iter_mut() {
            logger.log(msg);
        }
    }
}

#[derive(Debug)]
enum LoggerKind {
    File(FileLogger),
    Stdout,
    Stderr,
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

#[derive(Debug)]
struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    fn new(path: &PathBuf, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    // Flushes after each message so the file is readable while the process runs.
    fn log<S: Display>(&mut self, msg: &S) {
        let result = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());
        if let Err(err) = result {
            log::warn!("Unable to write to the log file: {err}");
        }
    }
}
