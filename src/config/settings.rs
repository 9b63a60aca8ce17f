//! Runtime settings loaded from TOML.
//!
//! These govern how cameras are enumerated and constructed. Device
//! parameters themselves live in the flat files handled by
//! [`ConfigStore`](super::ConfigStore).

use crate::camera::{CameraOptions, MockSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Enumeration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Prefix of generated mock identities (`<prefix>_<index>`).
    pub mock_prefix: String,
    /// Number of mock cameras reported.
    pub mock_pool_size: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            mock_prefix: "mock_cam".to_owned(),
            mock_pool_size: 25,
        }
    }
}

/// Devices exposed by the simulated SDK binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedSettings {
    /// User ids, in enumeration order.
    pub devices: Vec<String>,
}

impl Default for SimulatedSettings {
    fn default() -> Self {
        Self {
            devices: vec!["cam-0".to_owned()],
        }
    }
}

/// Settings validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("mock pool size must be at least 1")]
    EmptyMockPool,
    #[error("mock prefix must not be empty")]
    EmptyMockPrefix,
    #[error("invalid mock resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("failed to read settings file: {0}")]
    FileReadError(String),
    #[error("failed to parse settings file: {0}")]
    ParseError(String),
}

/// Full settings file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub camera: CameraOptions,
    #[serde(default)]
    pub mock: MockSettings,
    #[serde(default)]
    pub simulated: SimulatedSettings,
}

impl Settings {
    /// Loads settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SettingsError::FileReadError(e.to_string()))?;
        let settings: Settings =
            toml::from_str(&content).map_err(|e| SettingsError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.registry.mock_pool_size == 0 {
            return Err(SettingsError::EmptyMockPool);
        }
        if self.registry.mock_prefix.is_empty() {
            return Err(SettingsError::EmptyMockPrefix);
        }
        if self.mock.width == 0 || self.mock.height == 0 {
            return Err(SettingsError::InvalidResolution {
                width: self.mock.width,
                height: self.mock.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.registry.mock_pool_size, 25);
        assert_eq!(settings.camera.retrieve_retry_count, 3);
        assert_eq!((settings.mock.width, settings.mock.height), (640, 480));
    }

    #[test]
    fn test_zero_pool_invalid() {
        let mut settings = Settings::default();
        settings.registry.mock_pool_size = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::EmptyMockPool)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[registry]\nmock_pool_size = 4\n\n[camera]\nretrieve_retry_count = 1\nconfig_path = \"line.cfg\"\n\n[mock]\nwidth = 320\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.registry.mock_pool_size, 4);
        assert_eq!(settings.registry.mock_prefix, "mock_cam");
        assert_eq!(settings.camera.retrieve_retry_count, 1);
        assert_eq!(settings.camera.config_path.as_deref(), Some(Path::new("line.cfg")));
        assert_eq!((settings.mock.width, settings.mock.height), (320, 480));
        assert_eq!(settings.simulated.devices, vec!["cam-0".to_owned()]);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[registry\n").unwrap();
        assert!(matches!(Settings::from_file(&path), Err(SettingsError::ParseError(_))));
    }
}
