//! End-to-end checks of the camera contract through the public API.

use camera_core::{
    binding::{GrabFault, SimulatedBinding},
    camera::{Camera, CameraDriver, CameraError, CameraOptions, MockCameraDriver, TriggerMode},
    params, CameraIdentity, CameraRegistry, ConfigStore, DriverKind, ParamValue, ParameterSet,
};
use proptest::prelude::*;
use std::sync::Arc;

fn simulated(retries: u32) -> (Arc<SimulatedBinding>, CameraDriver<SimulatedBinding>) {
    let binding = Arc::new(SimulatedBinding::new(["line-a"]));
    let driver = CameraDriver::open(
        Arc::clone(&binding),
        CameraIdentity::new("line-a"),
        &CameraOptions::with_retry_count(retries),
    )
    .unwrap();
    (binding, driver)
}

/// Runs the same checks against any implementation of the contract.
fn exercise(camera: &mut dyn Camera) {
    camera.set_trigger_mode(TriggerMode::Triggered).unwrap();
    for _ in 0..3 {
        let result = camera.capture().unwrap();
        assert!(result.success());
        assert!(result.image().unwrap().is_valid());
    }
    assert!(camera.check_connection().unwrap());

    let range = camera.width_range().unwrap();
    assert!(matches!(
        camera.set_parameter(params::WIDTH, ParamValue::Float(range.max + 1.0)),
        Err(CameraError::OutOfRange { .. })
    ));

    camera.close().unwrap();
    camera.close().unwrap();
    assert!(matches!(camera.capture(), Err(CameraError::InvalidState { .. })));
}

#[test]
fn mock_and_hardware_drivers_are_interchangeable() {
    let mut mock = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap();
    exercise(&mut mock);

    let (_binding, mut driver) = simulated(1);
    exercise(&mut driver);
}

#[test]
fn mock_scenario_triggered_three_captures() {
    let registry = CameraRegistry::new(Arc::new(SimulatedBinding::new(Vec::<String>::new())));
    let id = registry.list_available(DriverKind::Mock).unwrap().remove(0);
    let mut camera = registry
        .open(DriverKind::Mock, id, &CameraOptions::with_retry_count(2))
        .unwrap();

    camera.set_trigger_mode(TriggerMode::Triggered).unwrap();
    let results: Vec<_> = (0..3).map(|_| camera.capture().unwrap()).collect();

    assert_eq!(results[0].image().unwrap().shape(), (480, 640, 3));
    assert!(results.iter().all(|r| r.success()));
}

#[test]
fn second_open_of_real_identity_is_unavailable() {
    let registry = CameraRegistry::new(Arc::new(SimulatedBinding::new(["line-a"])));
    let options = CameraOptions::default();
    let _held = registry.open(DriverKind::Real, "line-a".into(), &options).unwrap();

    assert!(matches!(
        registry.open(DriverKind::Real, "line-a".into(), &options),
        Err(CameraError::DeviceUnavailable { .. })
    ));
}

#[test]
fn second_open_of_mock_identity_is_unavailable() {
    let registry = CameraRegistry::new(Arc::new(SimulatedBinding::new(Vec::<String>::new())));
    let options = CameraOptions::default();
    let mut held = registry.open(DriverKind::Mock, "mock_cam_0".into(), &options).unwrap();

    assert!(matches!(
        registry.open(DriverKind::Mock, "mock_cam_0".into(), &options),
        Err(CameraError::DeviceUnavailable { .. })
    ));

    held.close().unwrap();
    assert!(registry.open(DriverKind::Mock, "mock_cam_0".into(), &options).is_ok());
}

#[test]
fn numeric_looking_text_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ids.cfg");
    let set: ParameterSet = [
        ("DeviceUserID", ParamValue::from("0042")),
        ("Mode", ParamValue::from("inf")),
    ]
    .into_iter()
    .collect();

    ConfigStore::export(&set, &path).unwrap();
    assert_eq!(ConfigStore::import(&path).unwrap(), set);

    let broken: ParameterSet = [("Label", ParamValue::from("a\nGain=9"))].into_iter().collect();
    assert!(ConfigStore::export(&broken, &path).is_err());
}

#[test]
fn exported_config_restores_a_fresh_driver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line-a.cfg");

    {
        let (_binding, mut driver) = simulated(0);
        driver.set_parameter(params::WIDTH, ParamValue::Int(800)).unwrap();
        driver.set_trigger_mode(TriggerMode::Triggered).unwrap();
        driver.export_config(&path).unwrap();
    }

    let binding = Arc::new(SimulatedBinding::new(["line-a"]));
    let options = CameraOptions {
        config_path: Some(path),
        ..CameraOptions::with_retry_count(0)
    };
    let mut driver = CameraDriver::open(binding, "line-a".into(), &options).unwrap();

    assert_eq!(driver.get_parameter(params::WIDTH).unwrap(), ParamValue::Int(800));
    assert_eq!(driver.trigger_mode().unwrap(), TriggerMode::Triggered);
    assert_eq!(driver.capture().unwrap().image().unwrap().shape(), (480, 800, 3));
}

#[test]
fn unknown_key_fails_at_apply_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.cfg");
    std::fs::write(&path, "Width=320\nSaturation=7\n").unwrap();

    let mut mock = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap();
    assert!(matches!(mock.import_config(&path), Err(CameraError::UnknownParameter(name)) if name == "Saturation"));
    assert_eq!(mock.get_parameter(params::WIDTH).unwrap(), ParamValue::Int(640));
}

#[test]
fn malformed_config_fails_construction_and_releases_device() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.cfg");
    std::fs::write(&path, "Width 320\n").unwrap();

    let binding = Arc::new(SimulatedBinding::new(["line-a"]));
    let options = CameraOptions {
        config_path: Some(path),
        ..Default::default()
    };
    let result = CameraDriver::open(Arc::clone(&binding), "line-a".into(), &options);

    assert!(matches!(result, Err(CameraError::MalformedConfig { line: 1, .. })));
    assert!(!binding.is_open(&"line-a".into()));
}

#[test]
fn missing_config_file_is_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut mock = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap();
    assert!(matches!(
        mock.import_config(&dir.path().join("absent.cfg")),
        Err(CameraError::IoFailure { .. })
    ));
}

#[test]
fn mock_parameter_set_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mock.cfg");
    let mut mock = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap();
    mock.set_exposure(2500.0).unwrap();
    mock.export_config(&path).unwrap();

    let expected: ParameterSet = mock.parameters().unwrap();
    let mut other = MockCameraDriver::new("mock_cam_1".into(), &CameraOptions::default()).unwrap();
    other.import_config(&path).unwrap();
    assert_eq!(other.parameters().unwrap(), expected);
    assert_eq!(other.exposure().unwrap(), 2500.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn retry_budget_absorbs_exactly_n_failures(n in 0u32..6, incomplete in any::<bool>()) {
        let fault = if incomplete { GrabFault::Incomplete } else { GrabFault::Timeout };

        let (binding, mut driver) = simulated(n);
        binding.inject_grab_faults(driver.identity(), fault, n).unwrap();
        prop_assert!(driver.capture().unwrap().success());

        let (binding, mut driver) = simulated(n);
        binding.inject_grab_faults(driver.identity(), fault, n + 1).unwrap();
        let result = driver.capture().unwrap();
        prop_assert!(!result.success());
        prop_assert!(result.image().is_none());
    }

    #[test]
    fn mock_capture_matches_configured_resolution(width in 8i64..256, height in 8i64..256) {
        let mut mock = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap();
        mock.set_parameter(params::WIDTH, ParamValue::Int(width)).unwrap();
        mock.set_parameter(params::HEIGHT, ParamValue::Int(height)).unwrap();

        let image = mock.capture().unwrap().into_image().unwrap();
        prop_assert_eq!(image.shape(), (height as usize, width as usize, 3));
    }

    #[test]
    fn range_boundaries_are_inclusive(offset in 1.0f64..1000.0) {
        let mut mock = MockCameraDriver::new("mock_cam_0".into(), &CameraOptions::default()).unwrap();
        let range = mock.exposure_range().unwrap();

        prop_assert!(mock.set_exposure(range.min).is_ok());
        prop_assert!(mock.set_exposure(range.max).is_ok());
        let below = matches!(mock.set_exposure(range.min - offset), Err(CameraError::OutOfRange { .. }));
        let above = matches!(mock.set_exposure(range.max + offset), Err(CameraError::OutOfRange { .. }));
        prop_assert!(below);
        prop_assert!(above);
    }
}
