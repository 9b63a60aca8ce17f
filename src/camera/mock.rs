//! Mock camera driver that generates synthetic frames without hardware.

use super::contract::{
    Camera, CameraError, CameraOptions, CameraState, CaptureResult, RetryPolicy, TriggerMode,
};
use super::Image;
use crate::binding::{BindingError, CameraIdentity};
use crate::metrics::CaptureMetrics;
use crate::params::{self, ParamRange, ParamValue, ParameterSet};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Fixed ranges reported by every mock camera.
const MOCK_RANGES: &[(&str, ParamRange)] = &[
    (params::EXPOSURE_TIME, ParamRange::new(100.0, 1_000_000.0)),
    (params::WIDTH, ParamRange::new(8.0, 4096.0)),
    (params::HEIGHT, ParamRange::new(8.0, 4096.0)),
    (params::GAIN, ParamRange::new(0.0, 24.0)),
    (params::GAMMA_PARAM, ParamRange::new(0.1, 4.0)),
    (params::CONTRAST_PARAM, ParamRange::new(-50.0, 100.0)),
];

/// Accepted values for the mock's enumerated parameters.
const MOCK_CHOICES: &[(&str, &[&str])] = &[
    (params::BALANCE_WHITE_AUTO, &["Off", "Once"]),
    (params::TRIGGER_MODE, &["Off", "On"]),
];

/// Mock identities currently held by a live driver.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockLeases(Arc<Mutex<HashSet<CameraIdentity>>>);

impl MockLeases {
    /// Claims `identity`, or returns `None` if another driver holds it.
    pub(crate) fn acquire(&self, identity: &CameraIdentity) -> Option<MockLease> {
        let mut held = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        held.insert(identity.clone()).then(|| MockLease {
            identity: identity.clone(),
            leases: self.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self, identity: &CameraIdentity) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(identity)
    }
}

/// Exclusive claim on a mock identity, released on drop.
#[derive(Debug)]
pub(crate) struct MockLease {
    identity: CameraIdentity,
    leases: MockLeases,
}

impl Drop for MockLease {
    fn drop(&mut self) {
        self.leases
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.identity);
    }
}

/// Mock camera settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    /// Initial frame width in pixels.
    pub width: u32,
    /// Initial frame height in pixels.
    pub height: u32,
    /// Simulated blocking time per capture.
    pub capture_delay_ms: u64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            capture_delay_ms: 0,
        }
    }
}

/// Software-only camera satisfying the same contract as
/// [`CameraDriver`](super::CameraDriver).
///
/// Captures always succeed, so the retry budget is accepted but never used.
/// Pixel content is random; shape and success are deterministic.
pub struct MockCameraDriver {
    identity: CameraIdentity,
    open: bool,
    retry: RetryPolicy,
    enhancement: bool,
    params: ParameterSet,
    capture_delay: Duration,
    rng: ChaCha8Rng,
    sequence: u64,
    lease: Option<MockLease>,
    metrics: Option<Arc<CaptureMetrics>>,
}

impl MockCameraDriver {
    /// Creates an open mock camera with default settings.
    pub fn new(identity: CameraIdentity, options: &CameraOptions) -> Result<Self, CameraError> {
        Self::with_settings(identity, options, &MockSettings::default())
    }

    /// Creates an open mock camera, applying `options.config_path` if set.
    pub fn with_settings(
        identity: CameraIdentity,
        options: &CameraOptions,
        settings: &MockSettings,
    ) -> Result<Self, CameraError> {
        let initial: ParameterSet = [
            (params::EXPOSURE_TIME, ParamValue::Float(1000.0)),
            (params::WIDTH, ParamValue::Int(settings.width.into())),
            (params::HEIGHT, ParamValue::Int(settings.height.into())),
            (params::GAIN, ParamValue::Float(0.0)),
            (params::BALANCE_WHITE_AUTO, ParamValue::from("Off")),
            (params::TRIGGER_MODE, ParamValue::from("Off")),
            (params::GAMMA_PARAM, ParamValue::Float(1.0)),
            (params::CONTRAST_PARAM, ParamValue::Int(0)),
        ]
        .into_iter()
        .collect();

        let mut camera = Self {
            identity,
            open: true,
            retry: options.retry_policy(),
            enhancement: options.image_quality_enhancement,
            params: initial,
            capture_delay: Duration::from_millis(settings.capture_delay_ms),
            rng: ChaCha8Rng::from_entropy(),
            sequence: 0,
            lease: None,
            metrics: None,
        };

        if let Some(path) = &options.config_path {
            camera.import_config(path)?;
        }

        tracing::info!(camera = %camera.identity, ?settings, "MockCamera opened");
        Ok(camera)
    }

    /// Holds `lease` until the camera is closed or dropped.
    pub(crate) fn with_lease(mut self, lease: MockLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Reports captures to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<CaptureMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn dimension(&self, name: &str) -> u32 {
        self.params
            .get(name)
            .and_then(ParamValue::as_f64)
            .map(|v| v as u32)
            .unwrap_or_default()
    }

    fn validate(&self, name: &str, value: &ParamValue) -> Result<(), CameraError> {
        if !self.params.contains(name) {
            return Err(CameraError::UnknownParameter(name.to_owned()));
        }
        if let Some((_, range)) = MOCK_RANGES.iter().find(|(n, _)| *n == name) {
            if value.as_f64().is_none() {
                return Err(CameraError::Device(BindingError::Rejected {
                    feature: name.to_owned(),
                    reason: format!("{value} is not numeric"),
                }));
            }
            if matches!(name, params::WIDTH | params::HEIGHT)
                && matches!(value, ParamValue::Float(v) if v.fract() != 0.0)
            {
                return Err(CameraError::Device(BindingError::Rejected {
                    feature: name.to_owned(),
                    reason: format!("{value} is not a whole number of pixels"),
                }));
            }
            if !range.contains(value) {
                return Err(CameraError::OutOfRange {
                    name: name.to_owned(),
                    value: value.clone(),
                    range: *range,
                });
            }
        }
        if let Some((_, choices)) = MOCK_CHOICES.iter().find(|(n, _)| *n == name) {
            if !value.as_str().is_some_and(|v| choices.contains(&v)) {
                return Err(CameraError::Device(BindingError::Rejected {
                    feature: name.to_owned(),
                    reason: format!("{value} is not one of {choices:?}"),
                }));
            }
        }
        Ok(())
    }
}

impl Camera for MockCameraDriver {
    fn identity(&self) -> &CameraIdentity {
        &self.identity
    }

    fn state(&self) -> CameraState {
        if self.open {
            CameraState::Open
        } else {
            CameraState::Closed
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn trigger_mode(&self) -> Result<TriggerMode, CameraError> {
        self.ensure_open("read trigger mode")?;
        Ok(self
            .params
            .get(params::TRIGGER_MODE)
            .map(TriggerMode::from_feature)
            .unwrap_or_default())
    }

    fn set_trigger_mode(&mut self, mode: TriggerMode) -> Result<(), CameraError> {
        self.ensure_open("set trigger mode")?;
        self.params.insert(params::TRIGGER_MODE, mode.feature_value());
        tracing::debug!(camera = %self.identity, %mode, "MockCamera trigger mode set");
        Ok(())
    }

    fn capture(&mut self) -> Result<CaptureResult, CameraError> {
        self.ensure_open("capture")?;
        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }

        let width = self.dimension(params::WIDTH);
        let height = self.dimension(params::HEIGHT);
        let mut pixels = vec![0u8; width as usize * height as usize * super::image::CHANNELS];
        self.rng.fill_bytes(&mut pixels);

        self.sequence += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_capture(self.identity.as_str());
        }
        Ok(CaptureResult::Captured(Image::new(pixels, width, height, self.sequence)))
    }

    fn get_parameter(&self, name: &str) -> Result<ParamValue, CameraError> {
        self.ensure_open("get parameter")?;
        self.params
            .get(name)
            .cloned()
            .ok_or_else(|| CameraError::UnknownParameter(name.to_owned()))
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), CameraError> {
        self.ensure_open("set parameter")?;
        self.validate(name, &value)?;
        self.params.insert(name, value);
        Ok(())
    }

    fn get_parameter_range(&self, name: &str) -> Result<ParamRange, CameraError> {
        self.ensure_open("get parameter range")?;
        MOCK_RANGES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, range)| *range)
            .ok_or_else(|| CameraError::UnknownParameter(name.to_owned()))
    }

    fn parameters(&self) -> Result<ParameterSet, CameraError> {
        self.ensure_open("read parameters")?;
        Ok(self.params.clone())
    }

    fn apply_parameters(&mut self, set: &ParameterSet) -> Result<(), CameraError> {
        self.ensure_open("apply parameters")?;
        for (name, value) in set.iter() {
            self.validate(name, value)?;
        }
        for (name, value) in set.iter() {
            self.params.insert(name, value.clone());
        }
        Ok(())
    }

    fn image_quality_enhancement(&self) -> bool {
        self.enhancement
    }

    fn set_image_quality_enhancement(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.ensure_open("set image quality enhancement")?;
        self.enhancement = enabled;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        if self.open {
            self.open = false;
            self.lease = None;
            tracing::info!(camera = %self.identity, "MockCamera closed");
        }
        Ok(())
    }
}

impl Drop for MockCameraDriver {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(camera = %self.identity, error = %e, "Failed to release mock camera");
        }
    }
}

impl std::fmt::Debug for MockCameraDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCameraDriver")
            .field("identity", &self.identity)
            .field("open", &self.open)
            .field("retry", &self.retry)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::WhiteBalance;

    fn mock() -> MockCameraDriver {
        MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap()
    }

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = mock();
        assert_eq!(camera.state(), CameraState::Open);

        let image = camera.capture().unwrap().into_image().unwrap();
        assert!(image.is_valid());
        assert_eq!(image.sequence(), 1);

        camera.close().unwrap();
        camera.close().unwrap();
        assert_eq!(camera.state(), CameraState::Closed);
        assert!(matches!(camera.capture(), Err(CameraError::InvalidState { .. })));
    }

    #[test]
    fn test_capture_matches_configured_resolution() {
        let mut camera = mock();
        assert_eq!(camera.capture().unwrap().image().unwrap().shape(), (480, 640, 3));

        camera.set_parameter(params::WIDTH, ParamValue::Int(320)).unwrap();
        camera.set_parameter(params::HEIGHT, ParamValue::Int(200)).unwrap();
        assert_eq!(camera.capture().unwrap().image().unwrap().shape(), (200, 320, 3));
    }

    #[test]
    fn test_settings_resolution() {
        let settings = MockSettings {
            width: 64,
            height: 32,
            ..Default::default()
        };
        let mut camera =
            MockCameraDriver::with_settings("mock_cam_1".into(), &CameraOptions::default(), &settings).unwrap();
        assert_eq!(camera.capture().unwrap().image().unwrap().shape(), (32, 64, 3));
    }

    #[test]
    fn test_zero_retry_budget_still_captures() {
        let mut camera = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::with_retry_count(0)).unwrap();
        assert!(camera.capture().unwrap().success());
        assert!(camera.check_connection().unwrap());
    }

    #[test]
    fn test_trigger_mode_round_trip() {
        let mut camera = mock();
        assert_eq!(camera.trigger_mode().unwrap(), TriggerMode::Continuous);
        camera.set_trigger_mode(TriggerMode::Triggered).unwrap();
        assert_eq!(camera.trigger_mode().unwrap(), TriggerMode::Triggered);
        camera.set_trigger_mode(TriggerMode::Continuous).unwrap();
        assert_eq!(camera.trigger_mode().unwrap(), TriggerMode::Continuous);
    }

    #[test]
    fn test_exposure_range_boundaries() {
        let mut camera = mock();
        let range = camera.exposure_range().unwrap();
        assert!(range.min < range.max);

        camera.set_exposure(range.min).unwrap();
        camera.set_exposure(range.max).unwrap();
        assert!(matches!(camera.set_exposure(range.min - 1.0), Err(CameraError::OutOfRange { .. })));
        assert!(matches!(camera.set_exposure(range.max + 1.0), Err(CameraError::OutOfRange { .. })));
        assert_eq!(camera.get_parameter(params::EXPOSURE_TIME).unwrap(), ParamValue::Float(range.max));
    }

    #[test]
    fn test_width_and_height_ranges() {
        let camera = mock();
        let width = camera.width_range().unwrap();
        let height = camera.height_range().unwrap();
        assert!(width.min < width.max);
        assert!(height.min < height.max);
    }

    #[test]
    fn test_white_balance() {
        let mut camera = mock();
        assert_eq!(camera.white_balance().unwrap(), WhiteBalance::Off);
        camera.set_white_balance(WhiteBalance::Once).unwrap();
        assert_eq!(camera.white_balance().unwrap(), WhiteBalance::Once);
        assert!(camera
            .set_parameter(params::BALANCE_WHITE_AUTO, "invalid".into())
            .is_err());
    }

    #[test]
    fn test_unknown_parameter() {
        let mut camera = mock();
        assert!(matches!(camera.get_parameter("Hue"), Err(CameraError::UnknownParameter(_))));
        assert!(matches!(
            camera.set_parameter("Hue", ParamValue::Int(1)),
            Err(CameraError::UnknownParameter(_))
        ));
        assert!(matches!(
            camera.get_parameter_range(params::TRIGGER_MODE),
            Err(CameraError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_fractional_dimensions_rejected() {
        let mut camera = mock();
        assert!(matches!(
            camera.set_parameter(params::WIDTH, ParamValue::Float(320.7)),
            Err(CameraError::Device(BindingError::Rejected { .. }))
        ));
        camera.set_parameter(params::HEIGHT, ParamValue::Float(200.0)).unwrap();

        let image = camera.capture().unwrap().into_image().unwrap();
        assert_eq!(image.shape(), (200, 640, 3));
        assert_eq!(camera.get_parameter(params::WIDTH).unwrap(), ParamValue::Int(640));
    }

    #[test]
    fn test_lease_released_on_close_and_drop() {
        let leases = MockLeases::default();
        let id = CameraIdentity::new("mock_cam_0");

        let lease = leases.acquire(&id).unwrap();
        assert!(leases.acquire(&id).is_none());
        let mut camera = mock().with_lease(lease);
        camera.close().unwrap();
        assert!(!leases.is_held(&id));

        let camera = mock().with_lease(leases.acquire(&id).unwrap());
        drop(camera);
        assert!(!leases.is_held(&id));
    }

    #[test]
    fn test_captures_are_counted() {
        let metrics = Arc::new(CaptureMetrics::new().unwrap());
        let mut camera = mock().with_metrics(Arc::clone(&metrics));
        camera.capture().unwrap();
        camera.capture().unwrap();
        assert_eq!(metrics.captures("mock_cam_0"), 2);
    }

    #[test]
    fn test_image_quality_enhancement_flag() {
        let mut camera = mock();
        assert!(!camera.image_quality_enhancement());
        camera.set_image_quality_enhancement(true).unwrap();
        assert!(camera.image_quality_enhancement());
    }
}
