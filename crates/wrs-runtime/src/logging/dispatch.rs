use core::time::Duration;

use super::Profiled;
use crate::config::{
    Logger,
    logger::{DispatchLogLevel, LoggerConfig},
};

/// Logs the dispatches of a client according to the logger configuration.
#[derive(Debug)]
pub struct DispatchLogger {
    level: DispatchLogLevel,
    logger: Logger,
    profiled: Profiled,
}

impl DispatchLogger {
    /// Creates a dispatch logger from its configuration.
    pub fn new(config: &LoggerConfig<DispatchLogLevel>) -> Self {
        let level = config.level;
        let logger = match level {
            DispatchLogLevel::Disabled => Logger::default(),
            _ => Logger::new(config),
        };

        Self {
            level,
            logger,
            profiled: Profiled::default(),
        }
    }

    /// The active log level.
    pub fn level(&self) -> DispatchLogLevel {
        self.level
    }

    /// If dispatches should be timed.
    pub fn is_timing(&self) -> bool {
        self.level == DispatchLogLevel::Full
    }

    /// Logs a dispatch, with its duration when timing is enabled.
    pub fn log_dispatch(&mut self, name: &str, cube_count: u32, duration: Option<Duration>) {
        match (self.level, duration) {
            (DispatchLogLevel::Disabled, _) => {}
            (DispatchLogLevel::Basic, _) | (DispatchLogLevel::Full, None) => {
                self.logger
                    .log(&format_args!("[dispatch] {name} cubes={cube_count}"));
            }
            (DispatchLogLevel::Full, Some(duration)) => {
                self.profiled.update(name, duration);
                self.logger.log(&format_args!(
                    "[dispatch] {name} cubes={cube_count} duration={duration:?}"
                ));
            }
        }
    }

    /// The durations accumulated so far.
    pub fn profiled(&self) -> &Profiled {
        &self.profiled
    }
}

impl Drop for DispatchLogger {
    fn drop(&mut self) {
        if !self.profiled.is_empty() {
            let summary = self.profiled.to_string();
            self.logger.log(&summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_level_profiles_dispatches() {
        let config = LoggerConfig {
            level: DispatchLogLevel::Full,
            ..Default::default()
        };
        let mut logger = DispatchLogger::new(&config);

        logger.log_dispatch("kernel", 4, Some(Duration::from_micros(10)));
        logger.log_dispatch("kernel", 4, Some(Duration::from_micros(12)));

        assert!(logger.is_timing());
        assert_eq!(logger.profiled().num_computed("kernel"), 2);
    }

    #[test]
    fn disabled_level_ignores_dispatches() {
        let mut logger = DispatchLogger::new(&LoggerConfig::default());

        logger.log_dispatch("kernel", 4, Some(Duration::from_micros(10)));

        assert!(!logger.is_timing());
        assert!(logger.profiled().is_empty());
    }
}
