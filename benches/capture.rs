use camera_core::{
    camera::{Camera, CameraOptions, MockCameraDriver},
    CameraDriver, CameraIdentity, SimulatedBinding,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn bench_capture(c: &mut Criterion) {
    let options = CameraOptions::default();

    let mut mock = MockCameraDriver::new(CameraIdentity::new("mock_cam_0"), &options).unwrap();
    c.bench_function("mock_capture_640x480", |b| b.iter(|| mock.capture().unwrap()));

    let binding = Arc::new(SimulatedBinding::new(["cam-0"]));
    let mut driver = CameraDriver::open(binding, CameraIdentity::new("cam-0"), &options).unwrap();
    c.bench_function("simulated_capture_640x480", |b| b.iter(|| driver.capture().unwrap()));
}

criterion_group!(benches, bench_capture);
criterion_main!(benches);
