//! Camera Core Library
//!
//! A uniform interface for acquiring images from industrial cameras:
//! capture with bounded retries, trigger-mode control, range-checked
//! parameters, flat-file configuration persistence, and a mock camera
//! that stands in for hardware during development and testing.
//!
//! # Architecture
//!
//! ```text
//! registry ──list/open──▶ camera (Camera trait)
//!                           ├─ CameraDriver ──▶ binding (DeviceBinding: vendor SDK)
//!                           └─ MockCameraDriver
//! config::ConfigStore ◀──export/import── camera
//! ```
//!
//! # Design Principles
//!
//! - **Substitutable drivers**: hardware and mock cameras share one trait
//! - **Scoped ownership**: a driver holds its device exclusively and releases it exactly once
//! - **Degraded, not failed**: exhausted capture retries are a result, not an error
//! - **Explicit ranges**: parameter writes are checked against device-reported bounds
//!
//! # Example
//!
//! ```
//! use camera_core::{
//!     binding::SimulatedBinding,
//!     camera::{Camera, CameraOptions, TriggerMode},
//!     registry::{CameraRegistry, DriverKind},
//! };
//! use std::sync::Arc;
//!
//! let registry = CameraRegistry::new(Arc::new(SimulatedBinding::new(["cam-0"])));
//! let ids = registry.list_available(DriverKind::Mock).unwrap();
//!
//! let mut camera = registry
//!     .open(DriverKind::Mock, ids[0].clone(), &CameraOptions::with_retry_count(2))
//!     .unwrap();
//! camera.set_trigger_mode(TriggerMode::Triggered).unwrap();
//!
//! let result = camera.capture().unwrap();
//! assert!(result.success());
//! assert_eq!(result.image().unwrap().shape(), (480, 640, 3));
//! camera.close().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod binding;
pub mod camera;
pub mod config;
pub mod metrics;
pub mod params;
pub mod registry;

// Re-export commonly used types at crate root
pub use binding::{CameraIdentity, DeviceBinding, SimulatedBinding};
pub use camera::{
    Camera, CameraDriver, CameraError, CameraOptions, CameraState, CaptureResult, Image,
    MockCameraDriver, RetryPolicy, TriggerMode,
};
pub use config::{ConfigStore, Settings};
pub use params::{ParamRange, ParamValue, ParameterSet};
pub use registry::{CameraRegistry, DriverKind};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
