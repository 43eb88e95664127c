//! Platform service abstraction
//!
//! The core never talks to OS frameworks directly. Location/compass,
//! camera permission and the AR session are reached through these traits so
//! the pipeline can run against real bindings or the scripted mocks.

pub mod mock;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorization::{AuthorizationState, CameraAuthorization};
use crate::overlay::IndicatorMesh;

pub use mock::{MockArSession, MockCamera, MockLocationService};

/// Requested location accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccuracy {
    #[default]
    Best,
    NearestTenMeters,
    HundredMeters,
    Kilometer,
}

/// How the AR world frame is oriented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldAlignment {
    /// Y follows gravity, origin yaw follows the device
    Gravity,
    /// Y follows gravity, -Z is true north
    GravityAndHeading,
    Camera,
}

/// World-tracking session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldTrackingConfig {
    pub world_alignment: WorldAlignment,
}

impl WorldTrackingConfig {
    /// The only alignment the bearing math is valid in.
    pub fn heading_aligned() -> Self {
        Self {
            world_alignment: WorldAlignment::GravityAndHeading,
        }
    }
}

/// Handle to an anchor placed in the AR scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(pub u64);

/// Platform-reported failure to run the AR session
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct SessionRunError {
    pub message: String,
}

impl SessionRunError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Compass + GPS service with its authorization state
pub trait LocationService {
    fn authorization_status(&self) -> AuthorizationState;

    /// Global location-services switch, independent of app authorization
    fn location_services_enabled(&self) -> bool;

    /// Asynchronous; the answer comes back as an authorization-change callback
    fn request_when_in_use_authorization(&mut self);

    fn set_desired_accuracy(&mut self, accuracy: LocationAccuracy);

    /// Minimum heading change in degrees before a new sample is delivered
    fn set_heading_filter(&mut self, degrees: f64);

    fn start_updating_heading(&mut self);
    fn stop_updating_heading(&mut self);
    fn start_updating_location(&mut self);
    fn stop_updating_location(&mut self);
}

/// Camera permission query
pub trait CameraPermission {
    fn authorization_status(&self) -> CameraAuthorization;
}

/// AR session with a scene graph of anchored meshes
pub trait ArSession {
    fn is_world_tracking_supported(&self) -> bool;

    fn run(&mut self, config: &WorldTrackingConfig) -> Result<(), SessionRunError>;

    /// Place an anchor at `offset` from the initial pose with `mesh` attached
    fn add_anchor(&mut self, offset: Vec3, mesh: &IndicatorMesh) -> AnchorId;

    /// Replace the attached mesh's rotation
    fn set_rotation(&mut self, anchor: AnchorId, rotation: Quat);

    fn remove_anchor(&mut self, anchor: AnchorId);

    fn pause(&mut self);
}
