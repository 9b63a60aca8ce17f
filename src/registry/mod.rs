//! Camera enumeration and construction by identity.

use crate::binding::{CameraIdentity, DeviceBinding};
use crate::camera::{
    Camera, CameraDriver, CameraError, CameraOptions, MockCameraDriver, MockLeases, MockSettings,
};
use crate::config::RegistrySettings;
use crate::metrics::CaptureMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which driver backs a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// A device reached through the SDK binding.
    Real,
    /// A software-only camera.
    Mock,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => f.write_str("real"),
            Self::Mock => f.write_str("mock"),
        }
    }
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "real" => Ok(Self::Real),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown driver kind: {other}")),
        }
    }
}

/// Generates `<prefix>_<index>` for `index` in `0..pool_size`.
pub fn mock_identities(prefix: &str, pool_size: usize) -> Vec<CameraIdentity> {
    (0..pool_size)
        .map(|i| CameraIdentity::new(format!("{prefix}_{i}")))
        .collect()
}

/// Lists and opens cameras of either kind.
pub struct CameraRegistry<B: DeviceBinding> {
    binding: Arc<B>,
    settings: RegistrySettings,
    mock: MockSettings,
    mock_leases: MockLeases,
    metrics: Option<Arc<CaptureMetrics>>,
}

impl<B: DeviceBinding + 'static> CameraRegistry<B> {
    /// Creates a registry with default mock settings.
    pub fn new(binding: Arc<B>) -> Self {
        Self::with_settings(binding, RegistrySettings::default(), MockSettings::default())
    }

    pub fn with_settings(binding: Arc<B>, settings: RegistrySettings, mock: MockSettings) -> Self {
        Self {
            binding,
            settings,
            mock,
            mock_leases: MockLeases::default(),
            metrics: None,
        }
    }

    /// Attaches capture counters to every driver opened from now on.
    pub fn with_metrics(mut self, metrics: Arc<CaptureMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn binding(&self) -> &Arc<B> {
        &self.binding
    }

    /// Identities currently enumerable for `kind`.
    ///
    /// Real identities come back in the order the SDK reports them.
    pub fn list_available(&self, kind: DriverKind) -> Result<Vec<CameraIdentity>, CameraError> {
        let identities = match kind {
            DriverKind::Mock => mock_identities(&self.settings.mock_prefix, self.settings.mock_pool_size),
            DriverKind::Real => self.binding.enumerate()?,
        };
        tracing::debug!(%kind, count = identities.len(), "Listed cameras");
        Ok(identities)
    }

    /// Constructs a driver for `identity`.
    ///
    /// A mock identity outside the configured pool or already held by a
    /// live driver is reported as unavailable, as is any real identity the
    /// binding cannot open.
    pub fn open(
        &self,
        kind: DriverKind,
        identity: CameraIdentity,
        options: &CameraOptions,
    ) -> Result<Box<dyn Camera>, CameraError> {
        match kind {
            DriverKind::Mock => {
                if !self.list_available(kind)?.contains(&identity) {
                    return Err(CameraError::DeviceUnavailable {
                        identity,
                        reason: "not in the mock pool".to_owned(),
                    });
                }
                let lease = self.mock_leases.acquire(&identity).ok_or_else(|| {
                    CameraError::DeviceUnavailable {
                        identity: identity.clone(),
                        reason: "already open".to_owned(),
                    }
                })?;
                let driver = MockCameraDriver::with_settings(identity, options, &self.mock)?.with_lease(lease);
                let driver = match &self.metrics {
                    Some(metrics) => driver.with_metrics(Arc::clone(metrics)),
                    None => driver,
                };
                Ok(Box::new(driver))
            }
            DriverKind::Real => {
                let driver = CameraDriver::open(Arc::clone(&self.binding), identity, options)?;
                let driver = match &self.metrics {
                    Some(metrics) => driver.with_metrics(Arc::clone(metrics)),
                    None => driver,
                };
                Ok(Box::new(driver))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SimulatedBinding;
    use crate::camera::CameraState;
    use std::collections::HashSet;

    fn registry() -> CameraRegistry<SimulatedBinding> {
        CameraRegistry::new(Arc::new(SimulatedBinding::new(["line-b", "line-a"])))
    }

    #[test]
    fn test_mock_identities_are_sequential_and_unique() {
        let settings = RegistrySettings {
            mock_prefix: "mock_cam".to_owned(),
            mock_pool_size: 5,
        };
        let registry = CameraRegistry::with_settings(
            Arc::new(SimulatedBinding::new(Vec::<String>::new())),
            settings,
            MockSettings::default(),
        );
        let ids = registry.list_available(DriverKind::Mock).unwrap();

        let expected: Vec<CameraIdentity> = (0..5).map(|i| format!("mock_cam_{i}").into()).collect();
        assert_eq!(ids, expected);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
    }

    #[test]
    fn test_default_mock_pool() {
        let ids = registry().list_available(DriverKind::Mock).unwrap();
        assert_eq!(ids.len(), 25);
        assert_eq!(ids[0].as_str(), "mock_cam_0");
        assert_eq!(ids[24].as_str(), "mock_cam_24");
    }

    #[test]
    fn test_real_listing_follows_binding_order() {
        let ids = registry().list_available(DriverKind::Real).unwrap();
        assert_eq!(ids, vec![CameraIdentity::new("line-b"), CameraIdentity::new("line-a")]);
    }

    #[test]
    fn test_open_each_kind() {
        let registry = registry();
        let options = CameraOptions::default();

        let mock = registry.open(DriverKind::Mock, "mock_cam_3".into(), &options).unwrap();
        assert_eq!(mock.state(), CameraState::Open);

        let real = registry.open(DriverKind::Real, "line-a".into(), &options).unwrap();
        assert_eq!(real.identity().as_str(), "line-a");
    }

    #[test]
    fn test_open_outside_mock_pool() {
        let result = registry().open(DriverKind::Mock, "mock_cam_99".into(), &CameraOptions::default());
        assert!(matches!(result, Err(CameraError::DeviceUnavailable { .. })));
    }

    #[test]
    fn test_real_open_is_exclusive() {
        let registry = registry();
        let options = CameraOptions::default();
        let mut first = registry.open(DriverKind::Real, "line-a".into(), &options).unwrap();

        assert!(matches!(
            registry.open(DriverKind::Real, "line-a".into(), &options),
            Err(CameraError::DeviceUnavailable { .. })
        ));

        first.close().unwrap();
        assert!(registry.open(DriverKind::Real, "line-a".into(), &options).is_ok());
    }

    #[test]
    fn test_mock_open_is_exclusive() {
        let registry = registry();
        let options = CameraOptions::default();
        let first = registry.open(DriverKind::Mock, "mock_cam_0".into(), &options).unwrap();

        assert!(matches!(
            registry.open(DriverKind::Mock, "mock_cam_0".into(), &options),
            Err(CameraError::DeviceUnavailable { .. })
        ));
        assert!(registry.open(DriverKind::Mock, "mock_cam_1".into(), &options).is_ok());

        drop(first);
        let mut again = registry.open(DriverKind::Mock, "mock_cam_0".into(), &options).unwrap();
        again.close().unwrap();
        assert!(registry.open(DriverKind::Mock, "mock_cam_0".into(), &options).is_ok());
    }

    #[test]
    fn test_metrics_cover_mock_drivers() {
        let metrics = Arc::new(CaptureMetrics::new().unwrap());
        let registry = registry().with_metrics(Arc::clone(&metrics));
        let mut camera = registry
            .open(DriverKind::Mock, "mock_cam_2".into(), &CameraOptions::default())
            .unwrap();

        camera.capture().unwrap();
        assert_eq!(metrics.captures("mock_cam_2"), 1);
    }

    #[test]
    fn test_driver_kind_parsing() {
        assert_eq!("MOCK".parse::<DriverKind>().unwrap(), DriverKind::Mock);
        assert_eq!("real".parse::<DriverKind>().unwrap(), DriverKind::Real);
        assert!("usb".parse::<DriverKind>().is_err());
    }
}
