//! Driver for a physical camera reached through a [`DeviceBinding`].
//!
//! The driver owns exactly one open device handle. Opening happens in
//! [`CameraDriver::open`]; the handle is released by [`Camera::close`] or,
//! failing that, when the driver is dropped.

use super::contract::{
    Camera, CameraError, CameraOptions, CameraState, CaptureResult, RetryPolicy, TriggerMode,
    WhiteBalance,
};
use super::{Enhancement, Image};
use crate::binding::{BindingError, CameraIdentity, DeviceBinding, DeviceHandle, RawFrame};
use crate::metrics::CaptureMetrics;
use crate::params::{self, ParamRange, ParamValue, ParameterSet};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Camera driver over a vendor SDK binding.
pub struct CameraDriver<B: DeviceBinding> {
    binding: Arc<B>,
    identity: CameraIdentity,
    /// `Some` while open; taken exactly once on release.
    handle: Option<DeviceHandle>,
    retry: RetryPolicy,
    trigger_mode: TriggerMode,
    enhancement: Option<Enhancement>,
    sequence: u64,
    metrics: Option<Arc<CaptureMetrics>>,
}

impl<B: DeviceBinding> CameraDriver<B> {
    /// Opens `identity` and applies `options`.
    ///
    /// Without a config path the device runs a one-shot auto white balance.
    /// If any step after the open fails, the device is released again.
    pub fn open(
        binding: Arc<B>,
        identity: CameraIdentity,
        options: &CameraOptions,
    ) -> Result<Self, CameraError> {
        let handle = binding
            .open(&identity)
            .map_err(|e| CameraError::DeviceUnavailable {
                identity: identity.clone(),
                reason: e.to_string(),
            })?;

        info!(camera = %identity, ?handle, "Camera opened");

        let mut driver = Self {
            binding,
            identity,
            handle: Some(handle),
            retry: options.retry_policy(),
            trigger_mode: TriggerMode::default(),
            enhancement: None,
            sequence: 0,
            metrics: None,
        };

        match &options.config_path {
            Some(path) => driver.import_config(path)?,
            None => {
                if let Err(e) = driver.set_white_balance(WhiteBalance::Once) {
                    warn!(camera = %driver.identity, error = %e, "Auto white balance unavailable");
                }
            }
        }

        driver.trigger_mode = driver.read_trigger_mode()?;
        if options.image_quality_enhancement {
            driver.set_image_quality_enhancement(true)?;
        }

        Ok(driver)
    }

    /// Reports capture outcomes to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<CaptureMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn open_handle(&self, operation: &'static str) -> Result<DeviceHandle, CameraError> {
        self.handle.ok_or(CameraError::InvalidState {
            operation,
            state: CameraState::Closed,
        })
    }

    fn read_trigger_mode(&self) -> Result<TriggerMode, CameraError> {
        let handle = self.open_handle("read trigger mode")?;
        let reading = self.binding.get_param(handle, params::TRIGGER_MODE)?;
        Ok(TriggerMode::from_feature(&reading.value))
    }

    /// Reads gamma/contrast from the device; either may be absent.
    fn load_enhancement(&self) -> Result<Enhancement, CameraError> {
        let handle = self.open_handle("configure enhancement")?;
        let gamma = match self.binding.get_param(handle, params::GAMMA_PARAM) {
            Ok(reading) => reading.value.as_f64(),
            Err(BindingError::UnknownFeature(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let contrast = match self.binding.get_param(handle, params::CONTRAST_PARAM) {
            Ok(reading) => reading.value.as_f64().map(|v| v as i64),
            Err(BindingError::UnknownFeature(_)) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Enhancement::new(gamma, contrast))
    }

    /// Checks `value` against the device-reported range for `name`.
    fn validate(&self, handle: DeviceHandle, name: &str, value: &ParamValue) -> Result<(), CameraError> {
        let reading = self.binding.get_param(handle, name)?;
        match reading.range {
            Some(range) if !range.contains(value) => Err(CameraError::OutOfRange {
                name: name.to_owned(),
                value: value.clone(),
                range,
            }),
            _ => Ok(()),
        }
    }

    fn write(&mut self, handle: DeviceHandle, name: &str, value: &ParamValue) -> Result<(), CameraError> {
        self.binding.set_param(handle, name, value)?;
        trace!(camera = %self.identity, parameter = name, %value, "Parameter written");

        match name {
            params::TRIGGER_MODE => self.trigger_mode = self.read_trigger_mode()?,
            params::GAMMA_PARAM | params::CONTRAST_PARAM if self.enhancement.is_some() => {
                self.enhancement = Some(self.load_enhancement()?);
            }
            _ => {}
        }
        Ok(())
    }

    /// One grab attempt, preceded by a software trigger when triggered.
    fn grab_once(&self, handle: DeviceHandle) -> Result<RawFrame, BindingError> {
        if self.trigger_mode == TriggerMode::Triggered {
            self.binding.send_command(handle, params::TRIGGER_SOFTWARE)?;
        }
        self.binding.grab(handle)
    }

    fn finish_frame(&mut self, frame: RawFrame) -> Image {
        self.sequence += 1;
        let mut image = Image::from_rgb(frame.data, frame.width, frame.height, self.sequence);
        if let Some(enhancement) = &self.enhancement {
            enhancement.apply(image.data_mut());
        }
        image
    }
}

impl<B: DeviceBinding> Camera for CameraDriver<B> {
    fn identity(&self) -> &CameraIdentity {
        &self.identity
    }

    fn state(&self) -> CameraState {
        if self.handle.is_some() {
            CameraState::Open
        } else {
            CameraState::Closed
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn trigger_mode(&self) -> Result<TriggerMode, CameraError> {
        self.open_handle("read trigger mode")?;
        Ok(self.trigger_mode)
    }

    fn set_trigger_mode(&mut self, mode: TriggerMode) -> Result<(), CameraError> {
        let handle = self.open_handle("set trigger mode")?;
        let written = self
            .binding
            .set_param(handle, params::TRIGGER_MODE, &mode.feature_value().into())
            .and_then(|()| match mode {
                TriggerMode::Triggered => self.binding.set_param(handle, params::TRIGGER_SOURCE, &"Software".into()),
                TriggerMode::Continuous => Ok(()),
            });

        // The device may have switched even if a later write failed.
        let actual = self.read_trigger_mode()?;
        self.trigger_mode = actual;
        if let Err(e) = written {
            return Err(CameraError::UnsupportedMode {
                mode,
                reason: e.to_string(),
            });
        }
        if actual != mode {
            return Err(CameraError::UnsupportedMode {
                mode,
                reason: format!("device reports {actual}"),
            });
        }

        info!(camera = %self.identity, %mode, "Trigger mode set");
        Ok(())
    }

    fn capture(&mut self) -> Result<CaptureResult, CameraError> {
        let handle = self.open_handle("capture")?;
        let attempts = self.retry.attempts();

        for attempt in 1..=attempts {
            match self.grab_once(handle) {
                Ok(frame) if frame.is_usable() => {
                    let image = self.finish_frame(frame);
                    debug!(camera = %self.identity, attempt, sequence = image.sequence(), "Frame captured");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_capture(self.identity.as_str());
                    }
                    return Ok(CaptureResult::Captured(image));
                }
                Ok(_) => debug!(camera = %self.identity, attempt, "Incomplete frame"),
                Err(e) => debug!(camera = %self.identity, attempt, error = %e, "Grab failed"),
            }
            if attempt < attempts {
                if let Some(metrics) = &self.metrics {
                    metrics.record_retry();
                }
            }
        }

        warn!(camera = %self.identity, attempts, "Capture retries exhausted");
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(self.identity.as_str());
        }
        Ok(CaptureResult::Exhausted { attempts })
    }

    fn get_parameter(&self, name: &str) -> Result<ParamValue, CameraError> {
        let handle = self.open_handle("get parameter")?;
        Ok(self.binding.get_param(handle, name)?.value)
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), CameraError> {
        let handle = self.open_handle("set parameter")?;
        self.validate(handle, name, &value)?;
        self.write(handle, name, &value)
    }

    fn get_parameter_range(&self, name: &str) -> Result<ParamRange, CameraError> {
        let handle = self.open_handle("get parameter range")?;
        self.binding
            .get_param(handle, name)?
            .range
            .ok_or_else(|| CameraError::UnknownParameter(name.to_owned()))
    }

    fn parameters(&self) -> Result<ParameterSet, CameraError> {
        let handle = self.open_handle("read parameters")?;
        let mut set = ParameterSet::new();
        for name in self.binding.list_params(handle)? {
            let value = self.binding.get_param(handle, &name)?.value;
            set.insert(name, value);
        }
        Ok(set)
    }

    fn apply_parameters(&mut self, set: &ParameterSet) -> Result<(), CameraError> {
        let handle = self.open_handle("apply parameters")?;
        for (name, value) in set.iter() {
            self.validate(handle, name, value)?;
        }
        for (name, value) in set.iter() {
            self.write(handle, name, value)?;
        }
        debug!(camera = %self.identity, parameters = set.len(), "Parameters applied");
        Ok(())
    }

    fn image_quality_enhancement(&self) -> bool {
        self.enhancement.is_some()
    }

    fn set_image_quality_enhancement(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.open_handle("set image quality enhancement")?;
        self.enhancement = if enabled {
            let enhancement = self.load_enhancement()?;
            debug!(camera = %self.identity, ?enhancement, "Image quality enhancement enabled");
            Some(enhancement)
        } else {
            None
        };
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        info!(camera = %self.identity, ?handle, "Camera closed");
        self.binding.close(handle).map_err(CameraError::Device)
    }
}

impl<B: DeviceBinding> Drop for CameraDriver<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(camera = %self.identity, error = %e, "Failed to release camera");
        }
    }
}

impl<B: DeviceBinding> std::fmt::Debug for CameraDriver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraDriver")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("trigger_mode", &self.trigger_mode)
            .field("retry", &self.retry)
            .field("enhancement", &self.enhancement)
            .finish()
    }
}
