//! In-process device binding with a fixed set of simulated cameras.
//!
//! Behaves like a vendor SDK from the driver's point of view: exclusive
//! opens, range-checked features, software triggering and grab faults that
//! can be scheduled per device.

use super::{BindingError, CameraIdentity, DeviceBinding, DeviceHandle, ParamReading, RawFrame};
use crate::params::{self, ParamRange, ParamValue};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A scheduled grab failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabFault {
    /// The grab call returns a timeout error.
    Timeout,
    /// The grab delivers a frame flagged incomplete.
    Incomplete,
}

#[derive(Debug, Clone)]
struct Feature {
    name: &'static str,
    value: ParamValue,
    range: Option<ParamRange>,
    choices: &'static [&'static str],
}

impl Feature {
    fn numeric(name: &'static str, value: ParamValue, min: f64, max: f64) -> Self {
        Self {
            name,
            value,
            range: Some(ParamRange::new(min, max)),
            choices: &[],
        }
    }

    fn choice(name: &'static str, value: &str, choices: &'static [&'static str]) -> Self {
        Self {
            name,
            value: ParamValue::from(value),
            range: None,
            choices,
        }
    }
}

fn default_features() -> Vec<Feature> {
    vec![
        Feature::numeric(params::WIDTH, ParamValue::Int(640), 8.0, 1920.0),
        Feature::numeric(params::HEIGHT, ParamValue::Int(480), 8.0, 1080.0),
        Feature::numeric(params::EXPOSURE_TIME, ParamValue::Float(10_000.0), 20.0, 1_000_000.0),
        Feature::numeric(params::GAIN, ParamValue::Float(0.0), 0.0, 24.0),
        Feature::choice(params::BALANCE_WHITE_AUTO, "Off", &["Off", "Once", "Continuous"]),
        Feature::choice(params::TRIGGER_MODE, "Off", &["Off", "On"]),
        Feature::choice(params::TRIGGER_SOURCE, "Software", &["Software", "Line0"]),
        Feature::numeric(params::GAMMA_PARAM, ParamValue::Float(1.0), 0.1, 4.0),
        Feature::numeric(params::CONTRAST_PARAM, ParamValue::Int(0), -50.0, 100.0),
    ]
}

#[derive(Debug)]
struct SimDevice {
    identity: CameraIdentity,
    handle: Option<DeviceHandle>,
    features: Vec<Feature>,
    faults: VecDeque<GrabFault>,
    rejected_writes: Vec<String>,
    trigger_pending: bool,
    triggers_sent: u64,
    frames_delivered: u64,
}

impl SimDevice {
    fn new(identity: CameraIdentity) -> Self {
        Self {
            identity,
            handle: None,
            features: default_features(),
            faults: VecDeque::new(),
            rejected_writes: Vec::new(),
            trigger_pending: false,
            triggers_sent: 0,
            frames_delivered: 0,
        }
    }

    fn feature(&self, name: &str) -> Result<&Feature, BindingError> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BindingError::UnknownFeature(name.to_owned()))
    }

    fn feature_mut(&mut self, name: &str) -> Result<&mut Feature, BindingError> {
        self.features
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| BindingError::UnknownFeature(name.to_owned()))
    }

    fn dimension(&self, name: &str) -> Result<u32, BindingError> {
        self.feature(name)?
            .value
            .as_f64()
            .map(|v| v as u32)
            .ok_or_else(|| BindingError::Fault(format!("{name} is not numeric")))
    }

    fn triggered(&self) -> bool {
        self.feature(params::TRIGGER_MODE)
            .map(|f| f.value.as_str() == Some("On"))
            .unwrap_or(false)
    }

    fn render_frame(&mut self) -> Result<RawFrame, BindingError> {
        let width = self.dimension(params::WIDTH)?;
        let height = self.dimension(params::HEIGHT)?;
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                // R follows the column, G the row, B is a constant tag.
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0x40]);
            }
        }
        self.frames_delivered += 1;
        Ok(RawFrame {
            width,
            height,
            data,
            complete: true,
        })
    }
}

#[derive(Debug, Default)]
struct SimState {
    devices: Vec<SimDevice>,
    next_handle: u32,
}

impl SimState {
    fn by_identity(&mut self, identity: &CameraIdentity) -> Result<&mut SimDevice, BindingError> {
        self.devices
            .iter_mut()
            .find(|d| &d.identity == identity)
            .ok_or_else(|| BindingError::NotFound(identity.clone()))
    }

    fn by_handle(&mut self, handle: DeviceHandle) -> Result<&mut SimDevice, BindingError> {
        self.devices
            .iter_mut()
            .find(|d| d.handle == Some(handle))
            .ok_or(BindingError::InvalidHandle(handle))
    }
}

/// Simulated SDK exposing a fixed list of devices.
#[derive(Debug, Default)]
pub struct SimulatedBinding {
    state: Mutex<SimState>,
}

impl SimulatedBinding {
    /// Creates a binding exposing the given user ids, in order.
    pub fn new<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let devices = user_ids
            .into_iter()
            .map(|id| SimDevice::new(CameraIdentity::new(id)))
            .collect();
        Self {
            state: Mutex::new(SimState {
                devices,
                next_handle: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedules `count` consecutive grab faults on a device.
    pub fn inject_grab_faults(
        &self,
        identity: &CameraIdentity,
        fault: GrabFault,
        count: u32,
    ) -> Result<(), BindingError> {
        let mut state = self.lock();
        let device = state.by_identity(identity)?;
        device.faults.extend(std::iter::repeat(fault).take(count as usize));
        Ok(())
    }

    /// Schedules `count` consecutive grab timeouts on a device.
    pub fn fail_next_grabs(&self, identity: &CameraIdentity, count: u32) -> Result<(), BindingError> {
        self.inject_grab_faults(identity, GrabFault::Timeout, count)
    }

    /// Makes the device refuse any `TriggerMode` write.
    pub fn reject_trigger_mode(&self, identity: &CameraIdentity, reject: bool) -> Result<(), BindingError> {
        self.reject_writes(identity, params::TRIGGER_MODE, reject)
    }

    /// Makes the device refuse (or accept again) writes to `feature`.
    pub fn reject_writes(&self, identity: &CameraIdentity, feature: &str, reject: bool) -> Result<(), BindingError> {
        let mut state = self.lock();
        let rejected = &mut state.by_identity(identity)?.rejected_writes;
        rejected.retain(|f| f != feature);
        if reject {
            rejected.push(feature.to_owned());
        }
        Ok(())
    }

    pub fn is_open(&self, identity: &CameraIdentity) -> bool {
        let mut state = self.lock();
        state
            .by_identity(identity)
            .map(|d| d.handle.is_some())
            .unwrap_or(false)
    }

    /// Number of software triggers the device has received.
    pub fn triggers_sent(&self, identity: &CameraIdentity) -> u64 {
        let mut state = self.lock();
        state.by_identity(identity).map(|d| d.triggers_sent).unwrap_or(0)
    }

    /// Number of complete frames the device has delivered.
    pub fn frames_delivered(&self, identity: &CameraIdentity) -> u64 {
        let mut state = self.lock();
        state.by_identity(identity).map(|d| d.frames_delivered).unwrap_or(0)
    }
}

impl DeviceBinding for SimulatedBinding {
    fn enumerate(&self) -> Result<Vec<CameraIdentity>, BindingError> {
        Ok(self.lock().devices.iter().map(|d| d.identity.clone()).collect())
    }

    fn open(&self, identity: &CameraIdentity) -> Result<DeviceHandle, BindingError> {
        let mut state = self.lock();
        let handle = DeviceHandle(state.next_handle);
        let device = state.by_identity(identity)?;
        if device.handle.is_some() {
            return Err(BindingError::Busy(identity.clone()));
        }
        device.handle = Some(handle);
        device.trigger_pending = false;
        state.next_handle += 1;
        tracing::debug!(camera = %identity, ?handle, "Simulated device opened");
        Ok(handle)
    }

    fn close(&self, handle: DeviceHandle) -> Result<(), BindingError> {
        let mut state = self.lock();
        let device = state.by_handle(handle)?;
        device.handle = None;
        tracing::debug!(camera = %device.identity, ?handle, "Simulated device closed");
        Ok(())
    }

    fn grab(&self, handle: DeviceHandle) -> Result<RawFrame, BindingError> {
        let mut state = self.lock();
        let device = state.by_handle(handle)?;

        match device.faults.pop_front() {
            Some(GrabFault::Timeout) => return Err(BindingError::Timeout),
            Some(GrabFault::Incomplete) => {
                return Ok(RawFrame {
                    width: 0,
                    height: 0,
                    data: Vec::new(),
                    complete: false,
                })
            }
            None => {}
        }

        if device.triggered() {
            if !device.trigger_pending {
                return Err(BindingError::Timeout);
            }
            device.trigger_pending = false;
        }

        device.render_frame()
    }

    fn get_param(&self, handle: DeviceHandle, name: &str) -> Result<ParamReading, BindingError> {
        let mut state = self.lock();
        let feature = state.by_handle(handle)?.feature(name)?;
        Ok(ParamReading {
            value: feature.value.clone(),
            range: feature.range,
        })
    }

    fn set_param(&self, handle: DeviceHandle, name: &str, value: &ParamValue) -> Result<(), BindingError> {
        let mut state = self.lock();
        let device = state.by_handle(handle)?;

        if device.rejected_writes.iter().any(|f| f == name) {
            return Err(BindingError::Rejected {
                feature: name.to_owned(),
                reason: "acquisition in progress".to_owned(),
            });
        }

        let feature = device.feature_mut(name)?;
        if let Some(range) = feature.range {
            if value.as_f64().is_none() || !range.contains(value) {
                return Err(BindingError::Rejected {
                    feature: name.to_owned(),
                    reason: format!("{value} not in {range}"),
                });
            }
        }
        if !feature.choices.is_empty() && !value.as_str().is_some_and(|v| feature.choices.contains(&v)) {
            return Err(BindingError::Rejected {
                feature: name.to_owned(),
                reason: format!("{value} is not one of {:?}", feature.choices),
            });
        }

        feature.value = match (&feature.value, value) {
            // Integer features stay integral even when written as floats.
            (ParamValue::Int(_), v) => ParamValue::Int(v.as_f64().map(|f| f as i64).unwrap_or_default()),
            (_, v) => v.clone(),
        };
        Ok(())
    }

    fn list_params(&self, handle: DeviceHandle) -> Result<Vec<String>, BindingError> {
        let mut state = self.lock();
        let device = state.by_handle(handle)?;
        Ok(device.features.iter().map(|f| f.name.to_owned()).collect())
    }

    fn send_command(&self, handle: DeviceHandle, command: &str) -> Result<(), BindingError> {
        let mut state = self.lock();
        let device = state.by_handle(handle)?;
        if command != params::TRIGGER_SOFTWARE {
            return Err(BindingError::UnknownFeature(command.to_owned()));
        }
        device.trigger_pending = true;
        device.triggers_sent += 1;
        Ok(())
    }
}
