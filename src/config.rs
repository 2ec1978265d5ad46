use eyre::{Context, Result};
use meshloop::LoopRunnerConfig;
use meshloop::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub runner: RunnerSection,
    pub events: EventsSection,
    pub dump: DumpSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub thread_name: String,
    pub log_level: String,
    pub stack_size: Option<usize>,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            thread_name: "meshloop-loop".to_string(),
            log_level: "trace".to_string(),
            stack_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    pub channel_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self { channel_capacity: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpSection {
    pub dir: PathBuf,
}

impl Default for DumpSection {
    fn default() -> Self {
        Self {
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("meshloop")
                .join("dumps"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            runner: RunnerSection::default(),
            events: EventsSection::default(),
            dump: DumpSection::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.runner.thread_name.trim().is_empty() {
            eyre::bail!("runner.thread_name must not be empty");
        }
        if self.runner.stack_size == Some(0) {
            eyre::bail!("runner.stack_size must be > 0");
        }
        if self.events.channel_capacity == 0 {
            eyre::bail!("events.channel_capacity must be > 0");
        }
        self.runner
            .log_level
            .parse::<LogLevel>()
            .context("runner.log_level is not a known level")?;
        Ok(())
    }

    /// Runner settings in library form
    pub fn runner_config(&self) -> LoopRunnerConfig {
        let config = LoopRunnerConfig::new(self.runner.thread_name.clone())
            .with_log_level(LogLevel::parse(&self.runner.log_level));
        match self.runner.stack_size {
            Some(bytes) => config.with_stack_size(bytes),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.runner.thread_name, "meshloop-loop");
        assert_eq!(config.runner.stack_size, None);
        assert_eq!(config.events.channel_capacity, 64);
        assert!(config.dump.dir.ends_with("dumps"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("meshloop.yml");
        fs::write(
            &path,
            "runner:\n  thread_name: tunnel-loop\n  log_level: debug\nevents:\n  channel_capacity: 8\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.runner.thread_name, "tunnel-loop");
        assert_eq!(config.runner.stack_size, None);
        assert_eq!(config.events.channel_capacity, 8);

        let runner_config = config.runner_config();
        assert_eq!(runner_config.thread_name, "tunnel-loop");
        assert_eq!(runner_config.log_level, LogLevel::Debug);
        assert_eq!(runner_config.stack_size, None);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yml");
        fs::write(&path, "runner:\n  stack_size: 0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_stack_size_reaches_runner_config() {
        let mut config = Config::default();
        config.runner.stack_size = Some(1024 * 1024);
        assert!(config.validate().is_ok());
        assert_eq!(config.runner_config().stack_size, Some(1024 * 1024));
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let mut config = Config::default();
        config.runner.log_level = "chatty".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
