use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use glam::Vec3;

use crate::bearing::POLARIS_AZIMUTH_DEG;
use crate::error::{PResult, StarPointerError};
use crate::overlay::IndicatorMesh;
use crate::platform::LocationAccuracy;

/// Runtime configuration, loadable from JSON. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Bearing the indicator points at, degrees clockwise from true north
    pub target_azimuth_deg: f64,
    /// Minimum heading change before the compass reports again
    pub heading_filter_deg: f64,
    pub desired_accuracy: LocationAccuracy,
    /// Anchor position relative to the initial camera pose (meters, -Z ahead)
    pub anchor_offset: [f32; 3],
    pub indicator: IndicatorMesh,
    /// Render/update tick
    pub tick_interval_ms: u64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            target_azimuth_deg: POLARIS_AZIMUTH_DEG,
            heading_filter_deg: 1.0,
            desired_accuracy: LocationAccuracy::Best,
            anchor_offset: [0.0, 0.0, -1.0],
            indicator: IndicatorMesh::default(),
            tick_interval_ms: 16,
        }
    }
}

impl PointerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> PResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: PointerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> PResult<()> {
        if !self.target_azimuth_deg.is_finite() {
            return Err(StarPointerError::InvalidConfig(
                "target_azimuth_deg must be finite".to_string(),
            ));
        }
        if !self.heading_filter_deg.is_finite() || self.heading_filter_deg < 0.0 {
            return Err(StarPointerError::InvalidConfig(format!(
                "heading_filter_deg must be >= 0, got {}",
                self.heading_filter_deg
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(StarPointerError::InvalidConfig(
                "tick_interval_ms must be > 0".to_string(),
            ));
        }
        if self.anchor_offset.iter().any(|v| !v.is_finite()) {
            return Err(StarPointerError::InvalidConfig(
                "anchor_offset must be finite".to_string(),
            ));
        }
        if !(self.indicator.height > 0.0 && self.indicator.radius > 0.0) {
            return Err(StarPointerError::InvalidConfig(format!(
                "indicator dimensions must be positive, got height {} radius {}",
                self.indicator.height, self.indicator.radius
            )));
        }
        Ok(())
    }

    pub fn anchor_offset(&self) -> Vec3 {
        Vec3::from_array(self.anchor_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::MeshShape;

    #[test]
    fn test_defaults_match_original_app() {
        let config = PointerConfig::default();
        assert_eq!(config.target_azimuth_deg, 0.0);
        assert_eq!(config.heading_filter_deg, 1.0);
        assert_eq!(config.desired_accuracy, LocationAccuracy::Best);
        assert_eq!(config.anchor_offset(), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(config.indicator.shape, MeshShape::Cone);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PointerConfig =
            serde_json::from_str(r#"{"target_azimuth_deg": 120.5, "desired_accuracy": "hundred_meters"}"#)
                .unwrap();
        assert_eq!(config.target_azimuth_deg, 120.5);
        assert_eq!(config.desired_accuracy, LocationAccuracy::HundredMeters);
        assert_eq!(config.tick_interval_ms, 16);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PointerConfig::default();
        config.heading_filter_deg = -1.0;
        assert!(matches!(config.validate(), Err(StarPointerError::InvalidConfig(_))));

        let mut config = PointerConfig::default();
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PointerConfig::default();
        config.indicator.radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = PointerConfig::default();
        config.target_azimuth_deg = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pointer.json");

        let mut config = PointerConfig::default();
        config.target_azimuth_deg = 45.0;
        config.save(&path).unwrap();

        let loaded = PointerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = PointerConfig::load("/nonexistent/pointer.json").unwrap_err();
        assert!(matches!(err, StarPointerError::Io(_)));
    }
}
