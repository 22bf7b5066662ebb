//! Configuration loading for the arm controller

use crate::{types::RunMode, DoosanError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the controller configuration
pub const DEFAULT_CONFIG_PATH: &str = "config/doosan.yaml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DoosanConfig {
    pub robot: RobotConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    pub address: String,
    #[serde(default = "default_driver_path")]
    pub driver_path: PathBuf,
    /// Home joint angles in degrees
    #[serde(default)]
    pub home: [f64; 6],
}

/// Retry policy applied by the caller around `initialize`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub retry_attempts: u32,
    pub retry_delay: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    pub home_velocity: f64,
    pub home_acceleration: f64,
    pub terminal_velocity: f64,
    pub terminal_acceleration: f64,
    pub line_settle_seconds: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub directory: PathBuf,
}

fn default_driver_path() -> PathBuf {
    PathBuf::from("./libdoosan.so")
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 1,
            retry_delay: 1.0,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Terminal,
            script: None,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            home_velocity: 10.0,
            home_acceleration: 10.0,
            terminal_velocity: 20.0,
            terminal_acceleration: 20.0,
            line_settle_seconds: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("log"),
            level: "info".to_string(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("record"),
        }
    }
}

impl DoosanConfig {
    /// Configuration with defaults for everything but the robot address
    pub fn new(address: &str) -> Self {
        Self {
            robot: RobotConfig {
                address: address.to_string(),
                driver_path: default_driver_path(),
                home: [0.0; 6],
            },
            connection: ConnectionConfig::default(),
            run: RunConfig::default(),
            motion: MotionConfig::default(),
            logging: LoggingConfig::default(),
            recording: RecordingConfig::default(),
        }
    }

    pub fn load_from_path(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let contents = fs::read_to_string(config_path).map_err(|e| {
            DoosanError::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        let config: DoosanConfig = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Reject configurations that cannot run before anything touches the driver
    pub fn validate(&self) -> Result<()> {
        if self.robot.address.trim().is_empty() {
            return Err(DoosanError::Config("robot.address must not be empty".to_string()));
        }

        if self.run.mode == RunMode::Offline && self.run.script.is_none() {
            return Err(DoosanError::Config(
                "offline mode requires run.script".to_string(),
            ));
        }

        if self.connection.retry_attempts == 0 {
            return Err(DoosanError::Config(
                "connection.retry_attempts must be at least 1".to_string(),
            ));
        }

        self.connection.retry_delay()?;

        Ok(())
    }
}

impl ConnectionConfig {
    /// Pause between connection attempts
    pub fn retry_delay(&self) -> Result<Duration> {
        seconds_to_duration("connection.retry_delay", self.retry_delay)
    }
}

/// Convert a seconds setting, rejecting negative, NaN, infinite and overflowing values
pub fn seconds_to_duration(name: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        DoosanError::Config(format!(
            "{} must be a finite, non-negative number of seconds, got {}",
            name, seconds
        ))
    })
}
