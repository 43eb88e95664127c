use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::authorization::AuthorizationState;
use crate::error::PResult;
use crate::heading_source::HeadingSource;
use crate::overlay::{BearingOverlayController, OverlayPhase};
use crate::platform::{ArSession, CameraPermission, LocationService};
use crate::sensors::current_timestamp;

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerStatus {
    pub timestamp: f64,
    pub heading_deg: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub authorization: AuthorizationState,
    pub error_message: Option<String>,
    pub overlay_phase: OverlayPhase,
    pub target_azimuth_deg: f64,
    pub indicator_bearing_deg: Option<f64>,
    pub sensor_errors: u64,
}

impl PointerStatus {
    pub fn capture<L, S, C>(
        source: &HeadingSource<L>,
        overlay: &BearingOverlayController<S, C>,
    ) -> PResult<Self>
    where
        L: LocationService,
        S: ArSession,
        C: CameraPermission,
    {
        let heading = source.latest_heading()?;
        let position = source.latest_position()?;

        Ok(Self {
            timestamp: current_timestamp(),
            heading_deg: heading.map(|h| h.true_heading_deg),
            latitude: position.map(|p| p.latitude),
            longitude: position.map(|p| p.longitude),
            authorization: source.authorization_state(),
            error_message: overlay.error_message(),
            overlay_phase: overlay.phase(),
            target_azimuth_deg: overlay.target_azimuth_deg(),
            indicator_bearing_deg: overlay.indicator_bearing_deg(),
            sensor_errors: source.sensor_error_count(),
        })
    }

    /// Overlay text, top to bottom
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(error) = &self.error_message {
            lines.push(error.clone());
        }
        if let Some(heading) = self.heading_deg {
            lines.push(format!("Heading: {}°", heading as i64));
        }
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            lines.push(format!("Lat: {:.4}, Lon: {:.4}", lat, lon));
        }
        lines
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
