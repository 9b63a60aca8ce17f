//! Vendor SDK capability boundary.
//!
//! Drivers never talk to a vendor SDK directly. They consume the narrow
//! [`DeviceBinding`] capability set, so any SDK that can enumerate, open,
//! grab and read/write features can back a [`CameraDriver`].
//!
//! [`CameraDriver`]: crate::camera::CameraDriver

mod sim;

pub use sim::{GrabFault, SimulatedBinding};

use crate::params::{ParamRange, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier of an enumerable camera.
///
/// Real devices are keyed by their vendor user id, mock devices by a
/// generated `<prefix>_<index>` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraIdentity(String);

impl CameraIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CameraIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CameraIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle to a device opened through a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u32);

/// A frame as delivered by the SDK: interleaved RGB, one byte per channel.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// False when the SDK flags the transfer as incomplete.
    pub complete: bool,
}

impl RawFrame {
    /// True when the frame is complete and its buffer matches its dimensions.
    pub fn is_usable(&self) -> bool {
        self.complete && self.data.len() == self.width as usize * self.height as usize * 3
    }
}

/// A feature read: current value plus the device-reported range, if numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamReading {
    pub value: ParamValue,
    pub range: Option<ParamRange>,
}

/// Errors reported by a device binding.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("device not found: {0}")]
    NotFound(CameraIdentity),
    #[error("device already open: {0}")]
    Busy(CameraIdentity),
    #[error("invalid device handle {0:?}")]
    InvalidHandle(DeviceHandle),
    #[error("grab timed out")]
    Timeout,
    #[error("feature not supported: {0}")]
    UnknownFeature(String),
    #[error("device rejected {feature}: {reason}")]
    Rejected { feature: String, reason: String },
    #[error("SDK fault: {0}")]
    Fault(String),
}

/// Capability set a vendor SDK must offer.
///
/// Methods take `&self`: a binding is shared by the registry and every
/// driver it creates, and synchronizes internally.
pub trait DeviceBinding: Send + Sync {
    /// Lists identities in the order the SDK reports them.
    fn enumerate(&self) -> Result<Vec<CameraIdentity>, BindingError>;

    /// Opens a device exclusively. Fails with `Busy` if it is already open.
    fn open(&self, identity: &CameraIdentity) -> Result<DeviceHandle, BindingError>;

    /// Releases a device handle.
    fn close(&self, handle: DeviceHandle) -> Result<(), BindingError>;

    /// Blocks until one frame is delivered or the SDK gives up.
    fn grab(&self, handle: DeviceHandle) -> Result<RawFrame, BindingError>;

    /// Reads a feature value and its range.
    fn get_param(&self, handle: DeviceHandle, name: &str) -> Result<ParamReading, BindingError>;

    /// Writes a feature value.
    fn set_param(&self, handle: DeviceHandle, name: &str, value: &ParamValue) -> Result<(), BindingError>;

    /// Names of the features that make up the device's persisted configuration.
    fn list_params(&self, handle: DeviceHandle) -> Result<Vec<String>, BindingError>;

    /// Executes a command feature such as `TriggerSoftware`.
    fn send_command(&self, handle: DeviceHandle, command: &str) -> Result<(), BindingError>;
}
