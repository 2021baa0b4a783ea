//! TOML configuration for jobdeck.
//!
//! Every section has compiled-in defaults, so an empty file (or no file at
//! all) yields a working dashboard for the default job profiles.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scheduler::calendar::parse_weekday;
use crate::scheduler::{profiles, JobDescriptor, ScheduleCalculator};
use crate::storage::DEFAULT_HISTORY_CAPACITY;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "JOBDECK_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "jobdeck.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "profiles::defaults")]
    pub jobs: Vec<JobDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            schedule: ScheduleConfig::default(),
            results: ResultsConfig::default(),
            runner: RunnerConfig::default(),
            logging: LoggingConfig::default(),
            jobs: profiles::defaults(),
        }
    }
}

impl Config {
    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), jobs = config.jobs.len(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. `explicit` (the `--config` flag); a failure here is an error.
    /// 2. The path in `JOBDECK_CONFIG`.
    /// 3. `./jobdeck.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "JOBDECK_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            return Self::load(local);
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Reject settings the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.schedule.calculator()?;

        if self.results.history_capacity == 0 {
            bail!("results.history_capacity must be at least 1");
        }
        if self.runner.timeout_secs == 0 {
            bail!("runner.timeout_secs must be at least 1");
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            if job.id.trim().is_empty() {
                bail!("job ids must not be empty");
            }
            if !seen.insert(job.id.as_str()) {
                bail!("duplicate job id '{}'", job.id);
            }
            if job.command.as_ref().is_some_and(|c| c.is_empty()) {
                bail!("job '{}' has an empty command", job.id);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the JSON API listens on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Weekday and time of day shared by both calendar rules, in IST.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub weekday: String,
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekday: "friday".to_string(),
            hour: 21,
            minute: 50,
        }
    }
}

impl ScheduleConfig {
    pub fn calculator(&self) -> Result<ScheduleCalculator> {
        let weekday = parse_weekday(&self.weekday)?;
        Ok(ScheduleCalculator::new(weekday, self.hour, self.minute)?)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Maximum number of history entries kept in memory.
    pub history_capacity: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound on a single job command's run time.
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
