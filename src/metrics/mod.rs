//! Prometheus counters for capture health.
//!
//! # Metrics Exposed
//!
//! - `camera_captures_total{camera}` - Captures that returned a frame
//! - `camera_capture_failures_total{camera}` - Captures that exhausted their retries
//! - `camera_grab_retries_total` - Repeated grab attempts across all cameras
//!
//! # Example
//!
//! ```
//! use camera_core::metrics::CaptureMetrics;
//!
//! let metrics = CaptureMetrics::new().expect("Failed to create registry");
//! metrics.record_capture("line-a");
//! assert!(metrics.encode().unwrap().contains("camera_captures_total"));
//! ```

mod collector;

pub use collector::{CaptureMetrics, MetricsError};
