//! Configuration: device parameter files and runtime settings.

mod settings;
mod store;

pub use settings::{RegistrySettings, Settings, SettingsError, SimulatedSettings};
pub use store::{ConfigError, ConfigStore};
