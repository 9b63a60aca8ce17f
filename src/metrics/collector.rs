//! Capture counters backed by a Prometheus registry.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Counters shared by every driver created with the same instance.
pub struct CaptureMetrics {
    registry: Registry,
    captures_total: IntCounterVec,
    capture_failures_total: IntCounterVec,
    grab_retries_total: IntCounter,
}

impl CaptureMetrics {
    /// Creates a registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let captures_total = IntCounterVec::new(
            Opts::new("camera_captures_total", "Successful captures per camera"),
            &["camera"],
        )?;
        let capture_failures_total = IntCounterVec::new(
            Opts::new(
                "camera_capture_failures_total",
                "Captures that exhausted their retry budget, per camera",
            ),
            &["camera"],
        )?;
        let grab_retries_total = IntCounter::new(
            "camera_grab_retries_total",
            "Grab attempts repeated after a failed or incomplete grab",
        )?;

        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(capture_failures_total.clone()))?;
        registry.register(Box::new(grab_retries_total.clone()))?;

        Ok(Self {
            registry,
            captures_total,
            capture_failures_total,
            grab_retries_total,
        })
    }

    pub fn record_capture(&self, camera: &str) {
        self.captures_total.with_label_values(&[camera]).inc();
    }

    pub fn record_failure(&self, camera: &str) {
        self.capture_failures_total.with_label_values(&[camera]).inc();
    }

    pub fn record_retry(&self) {
        self.grab_retries_total.inc();
    }

    pub fn captures(&self, camera: &str) -> u64 {
        self.captures_total.with_label_values(&[camera]).get()
    }

    pub fn failures(&self, camera: &str) -> u64 {
        self.capture_failures_total.with_label_values(&[camera]).get()
    }

    pub fn retries(&self) -> u64 {
        self.grab_retries_total.get()
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl std::fmt::Debug for CaptureMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureMetrics")
            .field("grab_retries_total", &self.grab_retries_total.get())
            .finish_non_exhaustive()
    }
}
