//! Camera contract shared by hardware and mock drivers.
//!
//! Anything implementing [`Camera`] can be handed to capture code in place
//! of any other implementation; the registry hands them out as
//! `Box<dyn Camera>`.

use super::Image;
use crate::binding::{BindingError, CameraIdentity};
use crate::config::{ConfigError, ConfigStore};
use crate::params::{self, ParamRange, ParamValue, ParameterSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera {identity} is unavailable: {reason}")]
    DeviceUnavailable {
        identity: CameraIdentity,
        reason: String,
    },
    #[error("cannot {operation} while the camera is {state}")]
    InvalidState {
        operation: &'static str,
        state: CameraState,
    },
    #[error("trigger mode {mode} rejected: {reason}")]
    UnsupportedMode { mode: TriggerMode, reason: String },
    #[error("{name}={value} is outside the device range {range}")]
    OutOfRange {
        name: String,
        value: ParamValue,
        range: ParamRange,
    },
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("malformed config at line {line}: {content:?}")]
    MalformedConfig { line: usize, content: String },
    #[error("cannot export {name:?}: {reason}")]
    UnrepresentableConfig { name: String, reason: &'static str },
    #[error("config I/O failed for {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("device error: {0}")]
    Device(#[source] BindingError),
}

impl From<BindingError> for CameraError {
    fn from(err: BindingError) -> Self {
        match err {
            BindingError::UnknownFeature(name) => Self::UnknownParameter(name),
            other => Self::Device(other),
        }
    }
}

impl From<ConfigError> for CameraError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Malformed { line, content } => Self::MalformedConfig { line, content },
            ConfigError::Unrepresentable { name, reason } => Self::UnrepresentableConfig { name, reason },
            ConfigError::Io { path, source } => Self::IoFailure { path, source },
        }
    }
}

/// Whether a driver currently holds its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Closed,
    Open,
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Open => f.write_str("open"),
        }
    }
}

/// Acquisition policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Frames stream at the device's own rate.
    #[default]
    Continuous,
    /// A frame is produced only on an explicit (software) trigger.
    Triggered,
}

impl TriggerMode {
    /// Value of the device's `TriggerMode` feature for this mode.
    pub fn feature_value(self) -> &'static str {
        match self {
            Self::Continuous => "Off",
            Self::Triggered => "On",
        }
    }

    /// Interprets a `TriggerMode` feature value.
    pub fn from_feature(value: &ParamValue) -> Self {
        match value {
            ParamValue::Text(s) if s.eq_ignore_ascii_case("on") => Self::Triggered,
            ParamValue::Int(1) => Self::Triggered,
            _ => Self::Continuous,
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => f.write_str("continuous"),
            Self::Triggered => f.write_str("triggered"),
        }
    }
}

impl FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continuous" => Ok(Self::Continuous),
            "trigger" | "triggered" => Ok(Self::Triggered),
            other => Err(format!("unknown trigger mode: {other}")),
        }
    }
}

/// Auto white balance setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteBalance {
    #[default]
    Off,
    /// Balance once on the next frames, then hold.
    Once,
}

impl WhiteBalance {
    pub fn feature_value(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Once => "Once",
        }
    }

    pub fn from_feature(value: &ParamValue) -> Self {
        match value {
            ParamValue::Text(s) if s.eq_ignore_ascii_case("once") => Self::Once,
            ParamValue::Int(2) => Self::Once,
            _ => Self::Off,
        }
    }
}

/// Number of additional grab attempts after a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retrieve_retry_count: u32,
}

impl RetryPolicy {
    pub const fn new(retrieve_retry_count: u32) -> Self {
        Self {
            retrieve_retry_count,
        }
    }

    #[inline]
    pub fn retrieve_retry_count(&self) -> u32 {
        self.retrieve_retry_count
    }

    /// Total grab attempts per capture: the initial one plus the retries.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.retrieve_retry_count.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Construction options shared by every driver kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Parameter file to apply right after opening.
    pub config_path: Option<PathBuf>,
    /// Apply gamma/contrast correction to captured frames.
    pub image_quality_enhancement: bool,
    /// Additional grab attempts after a failed one.
    pub retrieve_retry_count: u32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            image_quality_enhancement: false,
            retrieve_retry_count: RetryPolicy::default().retrieve_retry_count(),
        }
    }
}

impl CameraOptions {
    pub fn with_retry_count(retrieve_retry_count: u32) -> Self {
        Self {
            retrieve_retry_count,
            ..Default::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retrieve_retry_count)
    }
}

/// Outcome of a capture that reached the device.
///
/// Exhausting the retry budget is an expected operating condition and is
/// reported here rather than as an error.
#[derive(Debug, Clone)]
pub enum CaptureResult {
    Captured(Image),
    Exhausted { attempts: u32 },
}

impl CaptureResult {
    #[inline]
    pub fn success(&self) -> bool {
        matches!(self, Self::Captured(_))
    }

    pub fn image(&self) -> Option<&Image> {
        match self {
            Self::Captured(image) => Some(image),
            Self::Exhausted { .. } => None,
        }
    }

    pub fn into_image(self) -> Option<Image> {
        match self {
            Self::Captured(image) => Some(image),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Operations every camera driver provides.
///
/// All capture and parameter operations require [`CameraState::Open`] and
/// fail with [`CameraError::InvalidState`] otherwise.
pub trait Camera: Send {
    fn identity(&self) -> &CameraIdentity;

    fn state(&self) -> CameraState;

    fn retry_policy(&self) -> RetryPolicy;

    fn trigger_mode(&self) -> Result<TriggerMode, CameraError>;

    /// Switches trigger mode. Buffered frames are not preserved.
    fn set_trigger_mode(&mut self, mode: TriggerMode) -> Result<(), CameraError>;

    /// Grabs one frame, retrying up to the configured budget.
    fn capture(&mut self) -> Result<CaptureResult, CameraError>;

    fn get_parameter(&self, name: &str) -> Result<ParamValue, CameraError>;

    /// Writes a parameter after checking it against the device range.
    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), CameraError>;

    fn get_parameter_range(&self, name: &str) -> Result<ParamRange, CameraError>;

    /// Snapshot of the device's persisted parameters.
    fn parameters(&self) -> Result<ParameterSet, CameraError>;

    /// Applies a parameter set. Every entry is validated before any is written.
    fn apply_parameters(&mut self, set: &ParameterSet) -> Result<(), CameraError>;

    fn image_quality_enhancement(&self) -> bool;

    fn set_image_quality_enhancement(&mut self, enabled: bool) -> Result<(), CameraError>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self) -> Result<(), CameraError>;

    /// Fails with `InvalidState` unless the camera is open.
    fn ensure_open(&self, operation: &'static str) -> Result<(), CameraError> {
        match self.state() {
            CameraState::Open => Ok(()),
            state => Err(CameraError::InvalidState { operation, state }),
        }
    }

    /// Liveness probe: a capture whose image is discarded.
    fn check_connection(&mut self) -> Result<bool, CameraError> {
        Ok(self.capture()?.image().is_some_and(|img| img.width() > 0 && img.height() > 0))
    }

    /// Writes every persisted parameter to `path`.
    fn export_config(&self, path: &Path) -> Result<(), CameraError> {
        self.ensure_open("export config")?;
        ConfigStore::export(&self.parameters()?, path)?;
        tracing::info!(camera = %self.identity(), path = %path.display(), "Exported camera config");
        Ok(())
    }

    /// Reads `path` and applies it all-or-nothing.
    fn import_config(&mut self, path: &Path) -> Result<(), CameraError> {
        self.ensure_open("import config")?;
        let set = ConfigStore::import(path)?;
        self.apply_parameters(&set)?;
        tracing::info!(
            camera = %self.identity(),
            path = %path.display(),
            parameters = set.len(),
            "Imported camera config"
        );
        Ok(())
    }

    fn white_balance(&self) -> Result<WhiteBalance, CameraError> {
        Ok(WhiteBalance::from_feature(&self.get_parameter(params::BALANCE_WHITE_AUTO)?))
    }

    fn set_white_balance(&mut self, mode: WhiteBalance) -> Result<(), CameraError> {
        self.set_parameter(params::BALANCE_WHITE_AUTO, mode.feature_value().into())
    }

    fn exposure_range(&self) -> Result<ParamRange, CameraError> {
        self.get_parameter_range(params::EXPOSURE_TIME)
    }

    fn width_range(&self) -> Result<ParamRange, CameraError> {
        self.get_parameter_range(params::WIDTH)
    }

    fn height_range(&self) -> Result<ParamRange, CameraError> {
        self.get_parameter_range(params::HEIGHT)
    }

    /// Current exposure time in microseconds.
    fn exposure(&self) -> Result<f64, CameraError> {
        let value = self.get_parameter(params::EXPOSURE_TIME)?;
        value.as_f64().ok_or_else(|| CameraError::Device(BindingError::Rejected {
            feature: params::EXPOSURE_TIME.to_owned(),
            reason: format!("{value} is not numeric"),
        }))
    }

    fn set_exposure(&mut self, exposure_us: f64) -> Result<(), CameraError> {
        self.set_parameter(params::EXPOSURE_TIME, ParamValue::Float(exposure_us))
    }
}
