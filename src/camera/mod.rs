//! Camera drivers and the contract they share.
//!
//! [`CameraDriver`] drives a physical device through a
//! [`DeviceBinding`](crate::binding::DeviceBinding); [`MockCameraDriver`]
//! satisfies the same [`Camera`] contract without hardware.

mod contract;
mod driver;
mod enhance;
mod image;
mod mock;

pub use contract::{
    Camera, CameraError, CameraOptions, CameraState, CaptureResult, RetryPolicy, TriggerMode,
    WhiteBalance,
};
pub use driver::CameraDriver;
pub use enhance::Enhancement;
pub use image::{Image, CHANNELS};
pub use mock::{MockCameraDriver, MockSettings};
pub(crate) use mock::MockLeases;
