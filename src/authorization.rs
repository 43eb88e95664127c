use serde::{Deserialize, Serialize};

/// Location authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthorizationState {
    /// User has not been asked yet
    #[default]
    NotDetermined,
    /// User refused, or revoked a previous grant
    Denied,
    /// Blocked by device policy
    Restricted,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationState {
    /// Sensor subscriptions may only run in these states
    pub fn is_authorized(&self) -> bool {
        matches!(
            self,
            AuthorizationState::AuthorizedWhenInUse | AuthorizationState::AuthorizedAlways
        )
    }
}

/// Camera permission, only ever queried (never requested) by the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CameraAuthorization {
    #[default]
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

impl CameraAuthorization {
    pub fn is_authorized(&self) -> bool {
        *self == CameraAuthorization::Authorized
    }
}
