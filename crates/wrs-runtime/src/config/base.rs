use std::{path::Path, sync::Arc};

use super::{
    logger::{DispatchLogLevel, LoggerConfig},
    lookback::LookbackConfig,
    scheduler::SchedulerConfig,
};
use crate::ConfigLoadError;

/// Static mutex holding the global configuration, initialized as `None`.
static WRS_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// The name of the configuration file searched in the current directory and its parents.
pub const CONFIG_FILE_NAME: &str = "wrs.toml";

/// Represents the global configuration, combining the worker pool, dispatch logging and
/// lookback settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration of the worker pool.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Configuration of the dispatch logger.
    #[serde(default)]
    pub logger: LoggerConfig<DispatchLogLevel>,

    /// Configuration of the lookback protocol.
    #[serde(default)]
    pub lookback: LookbackConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `wrs.toml` in the current
    /// directory or its parents, then applies the environment overrides. If no file is found, a
    /// default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock. Read the values needed once at construction
    /// time instead of calling it in hot loops.
    pub fn get() -> Arc<Self> {
        let mut state = WRS_GLOBAL_CONFIG.lock();

        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                let config = Arc::new(Self::from_current_dir().override_from_env());
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    pub fn set(config: Self) {
        let mut state = WRS_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref()).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }

    /// Overrides configuration fields based on environment variables.
    ///
    /// - `WRS_WORKER_COUNT`: number of worker threads.
    /// - `WRS_DEBUG_LOG`: enables the dispatch logger, the value selects the output (`stdout`,
    ///   `stderr`, `log`, `1` for `/tmp/wrs.log` or a file path), `0` disables it.
    /// - `WRS_DEBUG_LOG_LEVEL`: `basic`, `full` or `disabled`.
    pub fn override_from_env(self) -> Self {
        self.override_with(|key| std::env::var(key).ok())
    }

    /// Overrides configuration fields using the given variable lookup.
    pub fn override_with<F: Fn(&str) -> Option<String>>(mut self, var: F) -> Self {
        if let Some(val) = var("WRS_WORKER_COUNT") {
            match val.parse::<usize>() {
                Ok(count) => self.scheduler.worker_count = Some(count),
                Err(err) => log::warn!("Ignoring WRS_WORKER_COUNT={val}: {err}"),
            }
        }

        if let Some(val) = var("WRS_DEBUG_LOG") {
            if self.logger.level == DispatchLogLevel::Disabled {
                self.logger.level = DispatchLogLevel::Basic;
            }

            match val.as_str() {
                "stdout" => self.logger.stdout = true,
                "stderr" => self.logger.stderr = true,
                "log" => self.logger.log = Some(Default::default()),
                "1" | "true" => self.logger.file = Some("/tmp/wrs.log".into()),
                "0" | "false" => self.logger.level = DispatchLogLevel::Disabled,
                file_path => self.logger.file = Some(file_path.into()),
            }
        }

        if let Some(val) = var("WRS_DEBUG_LOG_LEVEL") {
            match val.as_str() {
                "disabled" => self.logger.level = DispatchLogLevel::Disabled,
                "basic" => self.logger.level = DispatchLogLevel::Basic,
                "full" => self.logger.level = DispatchLogLevel::Full,
                _ => log::warn!("Ignoring unknown WRS_DEBUG_LOG_LEVEL={val}"),
            }
        }

        self
    }

    /// Loads a configuration from the given file.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;

        Ok(config)
    }

    // Traverses up the directory tree until a configuration file is found or the root is reached.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            match Self::from_file_path(dir.join(CONFIG_FILE_NAME)) {
                Ok(config) => return config,
                Err(ConfigLoadError::Io(_)) => {}
                Err(err) => panic!("{err}"),
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(key, val)| (key.to_string(), val.to_string()))
            .collect();
        move |key| {
            vars.iter()
                .find(|(name, _)| name == key)
                .map(|(_, val)| val.clone())
        }
    }

    #[test]
    fn env_overrides_worker_count_and_logger() {
        let config = GlobalConfig::default().override_with(lookup(&[
            ("WRS_WORKER_COUNT", "3"),
            ("WRS_DEBUG_LOG", "stderr"),
        ]));

        assert_eq!(config.scheduler.worker_count, Some(3));
        assert_eq!(config.logger.level, DispatchLogLevel::Basic);
        assert!(config.logger.stderr);
        assert!(!config.logger.stdout);
    }

    #[test]
    fn env_log_level_wins_over_debug_log() {
        let config = GlobalConfig::default().override_with(lookup(&[
            ("WRS_DEBUG_LOG", "/tmp/dispatch.log"),
            ("WRS_DEBUG_LOG_LEVEL", "full"),
        ]));

        assert_eq!(config.logger.level, DispatchLogLevel::Full);
        assert_eq!(config.logger.file, Some("/tmp/dispatch.log".into()));
    }

    #[test]
    fn invalid_worker_count_is_ignored() {
        let config =
            GlobalConfig::default().override_with(lookup(&[("WRS_WORKER_COUNT", "many")]));

        assert_eq!(config.scheduler.worker_count, None);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("wrs-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[scheduler]\nworker_count = 2\n\n[logger]\nlevel = \"full\"\nstdout = true\n",
        )
        .unwrap();

        let config = GlobalConfig::from_file_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.scheduler.worker_count(), 2);
        assert_eq!(config.logger.level, DispatchLogLevel::Full);
        assert!(config.logger.append);
        assert_eq!(
            config.lookback.stall_warning_spins,
            LookbackConfig::default().stall_warning_spins
        );
    }

    #[test]
    fn malformed_file_is_a_format_error() {
        let path = std::env::temp_dir().join(format!("wrs-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[scheduler]\nworker_count = \"two\"\n").unwrap();

        let result = GlobalConfig::from_file_path(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigLoadError::Format(_))));
    }
}
