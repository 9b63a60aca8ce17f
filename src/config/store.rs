//! Flat `key=value` persistence for device parameter sets.
//!
//! The format is device-agnostic: one pair per line, blank lines and lines
//! starting with `#` are ignored, values are stored as text. Text values
//! that would otherwise read back as numbers or lose padding are quoted.
//! Whether a key is known to a device is decided when the set is applied,
//! not here.

use crate::params::{ParamValue, ParameterSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Parameter file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line} is not a key=value pair: {content:?}")]
    Malformed { line: usize, content: String },
    #[error("cannot store {name:?} in a parameter file: {reason}")]
    Unrepresentable { name: String, reason: &'static str },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads and writes parameter files.
pub struct ConfigStore;

impl ConfigStore {
    /// Renders a set as file content, one line per parameter in set order.
    ///
    /// Fails if a name or value cannot survive a round trip through the
    /// line format.
    pub fn render(params: &ParameterSet) -> Result<String, ConfigError> {
        let mut out = format!(
            "# camera parameters\n# exported {}\n",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        for (name, value) in params.iter() {
            check_name(name)?;
            let text = value.to_config_text();
            if text.contains(['\n', '\r']) {
                return Err(ConfigError::Unrepresentable {
                    name: name.to_owned(),
                    reason: "value spans lines",
                });
            }
            out.push_str(name);
            out.push('=');
            out.push_str(&text);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parses file content. Values are trimmed and typed by [`ParamValue::parse`].
    pub fn parse(content: &str) -> Result<ParameterSet, ConfigError> {
        let mut set = ParameterSet::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = || ConfigError::Malformed {
                line: index + 1,
                content: raw.to_owned(),
            };
            let (key, value) = line.split_once('=').ok_or_else(malformed)?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed());
            }
            set.insert(key, ParamValue::parse(value));
        }
        Ok(set)
    }

    /// Writes `params` to `path`, creating or truncating the file.
    pub fn export(params: &ParameterSet, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let content = Self::render(params)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)?;
        tracing::debug!(path = %path.display(), parameters = params.len(), "Parameter file written");
        Ok(())
    }

    /// Reads a parameter file.
    pub fn import(path: &Path) -> Result<ParameterSet, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), parameters = set.len(), "Parameter file read");
        Ok(set)
    }
}

fn check_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "empty name"
    } else if name.trim() != name {
        "surrounding whitespace"
    } else if name.starts_with('#') {
        "reads as a comment"
    } else if name.contains(['=', '\n', '\r']) {
        "contains '=' or a line break"
    } else {
        return Ok(());
    };
    Err(ConfigError::Unrepresentable {
        name: name.to_owned(),
        reason,
    })
}
