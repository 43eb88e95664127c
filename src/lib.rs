// Star Pointer core
// Keeps an AR indicator pointed at a fixed celestial bearing using the compass heading

pub mod authorization;
pub mod bearing;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod heading_source;
pub mod overlay;
pub mod platform;
pub mod sensors;
pub mod status;

pub use authorization::{AuthorizationState, CameraAuthorization};
pub use config::PointerConfig;
pub use error::{PResult, StarPointerError};
pub use event_loop::{run_event_loop, LoopOptions, LoopSummary};
pub use heading_source::{HeadingSource, SharedReadings};
pub use overlay::{BearingOverlayController, IndicatorMesh, OverlayAnchor, OverlayPhase};
pub use sensors::{HeadingSample, PositionSample, SensorEvent};
pub use status::PointerStatus;
