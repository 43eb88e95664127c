use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::bearing::{indicator_rotation, relative_bearing, rotation_to_bearing};
use crate::error::{PResult, StarPointerError};
use crate::heading_source::SharedReadings;
use crate::platform::{AnchorId, ArSession, CameraPermission, WorldTrackingConfig};
use crate::sensors::HeadingSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshShape {
    Cone,
    Arrow,
}

/// Indicator geometry and material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMesh {
    pub shape: MeshShape,
    pub height: f32,
    pub radius: f32,
    /// Linear RGB in [0, 1]
    pub color: [f32; 3],
    pub metallic: bool,
}

impl Default for IndicatorMesh {
    fn default() -> Self {
        Self {
            shape: MeshShape::Cone,
            height: 0.2,
            radius: 0.05,
            color: [1.0, 0.0, 0.0],
            metallic: true,
        }
    }
}

/// The single anchored indicator. Only `rotation` changes after placement.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayAnchor {
    pub id: AnchorId,
    pub offset: Vec3,
    pub rotation: Quat,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayPhase {
    /// Constructed, startup not attempted
    Idle,
    /// Session running, anchor placed
    Running,
    /// A startup stage failed; terminal for this instance
    Failed,
    /// Torn down after running
    Stopped,
}

/// Owns the AR session and keeps one indicator pointed at a fixed azimuth.
pub struct BearingOverlayController<S: ArSession, C: CameraPermission> {
    session: S,
    camera: C,
    target_azimuth_deg: f64,
    anchor_offset: Vec3,
    mesh: IndicatorMesh,
    anchor: Option<OverlayAnchor>,
    error: Option<StarPointerError>,
    phase: OverlayPhase,
}

impl<S: ArSession, C: CameraPermission> BearingOverlayController<S, C> {
    pub fn new(
        session: S,
        camera: C,
        target_azimuth_deg: f64,
        anchor_offset: Vec3,
        mesh: IndicatorMesh,
    ) -> Self {
        Self {
            session,
            camera,
            target_azimuth_deg,
            anchor_offset,
            mesh,
            anchor: None,
            error: None,
            phase: OverlayPhase::Idle,
        }
    }

    /// One-shot startup: capability, camera permission, session, anchor.
    ///
    /// The first failing stage records the error and stops the sequence.
    /// Nothing is retried; a new controller is needed for another attempt.
    pub fn start(&mut self) -> PResult<()> {
        if self.phase != OverlayPhase::Idle {
            return Err(StarPointerError::InvalidState(format!(
                "start called in {:?}",
                self.phase
            )));
        }

        if !self.session.is_world_tracking_supported() {
            return Err(self.fail(StarPointerError::Unsupported));
        }

        // Only queried. Prompting from inside the render path is not allowed.
        let camera = self.camera.authorization_status();
        if !camera.is_authorized() {
            return Err(self.fail(StarPointerError::Unauthorized(format!(
                "camera {:?}",
                camera
            ))));
        }

        // Gravity-aligned vertical and true-north reference, the same ones
        // the compass heading is expressed in
        let config = WorldTrackingConfig::heading_aligned();

        if let Err(e) = self.session.run(&config) {
            return Err(self.fail(StarPointerError::StartFailure(e.message)));
        }

        let id = self.session.add_anchor(self.anchor_offset, &self.mesh);
        self.anchor = Some(OverlayAnchor {
            id,
            offset: self.anchor_offset,
            rotation: Quat::IDENTITY,
        });
        self.phase = OverlayPhase::Running;
        log::info!(
            "AR session running, indicator anchored at {:?} targeting {:.1}°",
            self.anchor_offset,
            self.target_azimuth_deg
        );
        Ok(())
    }

    fn fail(&mut self, error: StarPointerError) -> StarPointerError {
        log::error!("AR startup failed: {}", error.user_message());
        if self.error.is_none() {
            self.error = Some(error.clone());
        }
        self.phase = OverlayPhase::Failed;
        error
    }

    /// Per-tick update from the shared readings.
    pub fn update(&mut self, readings: &SharedReadings) -> PResult<Option<f64>> {
        let heading = readings.latest_heading()?;
        Ok(self.apply_heading(heading.as_ref()))
    }

    /// Point the indicator for `heading` and return the applied bearing.
    ///
    /// The rotation is assigned, never composed, so repeated calls with the
    /// same sample leave the same orientation. Before startup completes,
    /// after teardown, or without a sample this does nothing.
    ///
    /// The yaw is heading-relative: zero is the direction the device faced
    /// when the sample was taken, positive turns to the device's right.
    pub fn apply_heading(&mut self, heading: Option<&HeadingSample>) -> Option<f64> {
        if self.phase != OverlayPhase::Running {
            return None;
        }
        let anchor = self.anchor.as_mut()?;
        let sample = heading?;

        let bearing = relative_bearing(self.target_azimuth_deg, sample.true_heading_deg);
        let rotation = indicator_rotation(bearing);
        anchor.rotation = rotation;
        self.session.set_rotation(anchor.id, rotation);
        Some(bearing)
    }

    /// Remove the anchor and pause the session. Later updates are no-ops.
    pub fn teardown(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            self.session.remove_anchor(anchor.id);
        }
        if self.phase == OverlayPhase::Running {
            self.session.pause();
            self.phase = OverlayPhase::Stopped;
            log::info!("AR session stopped");
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&StarPointerError> {
        self.error.as_ref()
    }

    /// User-visible error, if startup failed
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.user_message())
    }

    pub fn anchor(&self) -> Option<&OverlayAnchor> {
        self.anchor.as_ref()
    }

    /// Current indicator yaw as a clockwise bearing from device-forward
    pub fn indicator_bearing_deg(&self) -> Option<f64> {
        self.anchor.as_ref().map(|a| rotation_to_bearing(a.rotation))
    }

    pub fn target_azimuth_deg(&self) -> f64 {
        self.target_azimuth_deg
    }
}
