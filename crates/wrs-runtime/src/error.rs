use thiserror::Error;

use crate::BackTrace;

/// Error that can happen when launching a kernel.
#[derive(Error, Clone)]
pub enum LaunchError {
    /// A kernel panicked while executing one of its cubes.
    ///
    /// The remaining cubes of the dispatch are skipped, the content of the buffers written by
    /// the kernel is unspecified.
    #[error(
        "A kernel panicked during execution\nCaused by:\n  {reason}\nBacktrace\n{backtrace}"
    )]
    Execution {
        /// The panic message of the failing cube.
        reason: String,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },

    /// A worker thread is gone and can't receive work anymore.
    #[error("The worker pool is disconnected\nCaused by:\n  {reason}")]
    WorkerDisconnected {
        /// Why the worker is unreachable.
        reason: String,
    },
}

impl core::fmt::Debug for LaunchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

/// Error that can happen when loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    /// The file couldn't be read.
    #[error("Unable to read the configuration file\nCaused by:\n  {0}")]
    Io(#[from] std::io::Error),

    /// The file isn't valid toml for the configuration.
    #[error("The file provided doesn't have the right format\nCaused by:\n  {0}")]
    Format(#[from] toml::de::Error),
}
