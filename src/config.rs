//! Application configuration, read once at startup from a TOML file.

use crate::dispatch::DispatchSettings;
use crate::keys::KeySettings;
use crate::telemetry::TelemetrySettings;
use crate::transport::TransportSettings;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{warn, Level};

pub const CONFIG_ENV: &str = "VELOLINK_CONFIG";
const APP_DIR: &str = "velolink";
const CONFIG_FILE: &str = "config.toml";
const REPORT_DIR: &str = "reports";

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub transport: TransportSettings,
    pub dispatch: DispatchSettings,
    pub keys: KeySettings,
    pub telemetry: TelemetrySettings,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Level {
        Level::from_str(self.level.trim()).unwrap_or(Level::INFO)
    }
}

impl AppConfig {
    /// Reads the config file, writing the defaults first if it does not exist
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            let config = Self::default();
            config.save(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// Configured report directory or the platform data directory
    pub fn report_dir(&self) -> PathBuf {
        match &self.telemetry.report_dir {
            Some(dir) => dir.clone(),
            None => default_report_dir(),
        }
    }
}

/// `$VELOLINK_CONFIG`, otherwise `<config dir>/velolink/config.toml`
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
    path.push(APP_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}

pub fn default_report_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| {
        warn!("No data directory available, writing reports to the working directory");
        PathBuf::from(".")
    });
    path.push(APP_DIR);
    path.push(REPORT_DIR);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert!(!config.dispatch.processing_enabled);
        assert_eq!(config.dispatch.game_mode, "default");
        assert_eq!(config.dispatch.pending_capacity, 50);
        assert_eq!(config.dispatch.replay_delay_ms, 100);
        assert!(config.keys.enabled);
        assert!(!config.keys.game_mode);
        assert_eq!(config.keys.delay_between_keys_ms, 10);
        assert_eq!(config.telemetry.wheel_diameter_mm, 700.0);
        assert_eq!(config.telemetry.tick_interval_ms, 1000);
        assert_eq!(config.logging.max_level(), Level::INFO);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() -> Result<()> {
        let config: AppConfig = toml::from_str(
            r#"
            [dispatch]
            game_mode = "racing"

            [telemetry]
            wheel_diameter_mm = 622.0
            report_dir = "/tmp/velolink-reports"

            [logging]
            level = "debug"
            "#,
        )?;

        assert_eq!(config.dispatch.game_mode, "racing");
        assert_eq!(config.dispatch.pending_capacity, 50);
        assert_eq!(config.telemetry.wheel_diameter_mm, 622.0);
        assert_eq!(config.report_dir(), PathBuf::from("/tmp/velolink-reports"));
        assert_eq!(config.logging.max_level(), Level::DEBUG);
        assert!(config.transport.device.is_none());
        Ok(())
    }

    #[test]
    fn unknown_log_level_means_info() {
        let logging = LoggingConfig {
            level: "chatty".to_string(),
        };
        assert_eq!(logging.max_level(), Level::INFO);
    }

    #[tokio::test]
    async fn first_run_writes_default_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("config.toml");

        let created = AppConfig::load_or_create(&path).await?;
        assert!(path.exists());

        let mut changed = created.clone();
        changed.transport.device = Some(PathBuf::from("/dev/rfcomm0"));
        changed.save(&path).await?;

        let loaded = AppConfig::load_or_create(&path).await?;
        assert_eq!(loaded.transport.device, Some(PathBuf::from("/dev/rfcomm0")));
        assert_eq!(loaded.transport.channel_capacity, 100);
        Ok(())
    }
}
