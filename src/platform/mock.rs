//! Scripted platform implementations for testing and the simulator binary
//!
//! Each mock is a cheap clonable handle over shared state, so a test can keep
//! one clone for inspection while the component under test owns another.

use glam::{Quat, Vec3};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::Sender;

use super::{
    AnchorId, ArSession, CameraPermission, LocationAccuracy, LocationService, SessionRunError,
    WorldTrackingConfig,
};
use crate::authorization::{AuthorizationState, CameraAuthorization};
use crate::overlay::IndicatorMesh;
use crate::sensors::SensorEvent;

/// Oldest calls are dropped past this many, so long simulator runs stay bounded
pub const CALL_LOG_CAPACITY: usize = 500;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record<T>(calls: &mut VecDeque<T>, call: T) {
    if calls.len() >= CALL_LOG_CAPACITY {
        calls.pop_front();
    }
    calls.push_back(call);
}

/// Calls recorded by [`MockLocationService`]
#[derive(Debug, Clone, PartialEq)]
pub enum LocationCall {
    RequestWhenInUse,
    SetDesiredAccuracy(LocationAccuracy),
    SetHeadingFilter(f64),
    StartHeading,
    StopHeading,
    StartLocation,
    StopLocation,
}

#[derive(Debug)]
struct LocationState {
    authorization: AuthorizationState,
    services_enabled: bool,
    grant_on_request: Option<AuthorizationState>,
    heading_active: bool,
    location_active: bool,
    calls: VecDeque<LocationCall>,
    events: Option<Sender<SensorEvent>>,
}

/// Mock compass/GPS service
#[derive(Debug, Clone)]
pub struct MockLocationService {
    state: Arc<Mutex<LocationState>>,
}

impl MockLocationService {
    pub fn new(authorization: AuthorizationState) -> Self {
        Self {
            state: Arc::new(Mutex::new(LocationState {
                authorization,
                services_enabled: true,
                grant_on_request: None,
                heading_active: false,
                location_active: false,
                calls: VecDeque::with_capacity(CALL_LOG_CAPACITY),
                events: None,
            })),
        }
    }

    /// Answer the next permission request with `answer`
    pub fn grant_on_request(self, answer: AuthorizationState) -> Self {
        lock(&self.state).grant_on_request = Some(answer);
        self
    }

    pub fn with_services_enabled(self, enabled: bool) -> Self {
        lock(&self.state).services_enabled = enabled;
        self
    }

    /// Deliver authorization callbacks on this channel
    pub fn with_event_sender(self, tx: Sender<SensorEvent>) -> Self {
        lock(&self.state).events = Some(tx);
        self
    }

    /// Change authorization from outside the app, e.g. in system settings
    pub fn set_authorization(&self, authorization: AuthorizationState) {
        let tx = {
            let mut state = lock(&self.state);
            state.authorization = authorization;
            state.events.clone()
        };
        if let Some(tx) = tx {
            if tx.try_send(SensorEvent::AuthorizationChanged(authorization)).is_err() {
                log::warn!("[mock] authorization callback dropped");
            }
        }
    }

    pub fn calls(&self) -> Vec<LocationCall> {
        lock(&self.state).calls.iter().cloned().collect()
    }

    pub fn count(&self, call: &LocationCall) -> usize {
        lock(&self.state).calls.iter().filter(|c| *c == call).count()
    }

    pub fn heading_active(&self) -> bool {
        lock(&self.state).heading_active
    }

    pub fn location_active(&self) -> bool {
        lock(&self.state).location_active
    }
}

impl LocationService for MockLocationService {
    fn authorization_status(&self) -> AuthorizationState {
        lock(&self.state).authorization
    }

    fn location_services_enabled(&self) -> bool {
        lock(&self.state).services_enabled
    }

    fn request_when_in_use_authorization(&mut self) {
        let answer = {
            let mut state = lock(&self.state);
            record(&mut state.calls, LocationCall::RequestWhenInUse);
            state.grant_on_request.take()
        };
        if let Some(answer) = answer {
            self.set_authorization(answer);
        }
    }

    fn set_desired_accuracy(&mut self, accuracy: LocationAccuracy) {
        record(&mut lock(&self.state).calls, LocationCall::SetDesiredAccuracy(accuracy));
    }

    fn set_heading_filter(&mut self, degrees: f64) {
        record(&mut lock(&self.state).calls, LocationCall::SetHeadingFilter(degrees));
    }

    fn start_updating_heading(&mut self) {
        let mut state = lock(&self.state);
        record(&mut state.calls, LocationCall::StartHeading);
        state.heading_active = true;
    }

    fn stop_updating_heading(&mut self) {
        let mut state = lock(&self.state);
        record(&mut state.calls, LocationCall::StopHeading);
        state.heading_active = false;
    }

    fn start_updating_location(&mut self) {
        let mut state = lock(&self.state);
        record(&mut state.calls, LocationCall::StartLocation);
        state.location_active = true;
    }

    fn stop_updating_location(&mut self) {
        let mut state = lock(&self.state);
        record(&mut state.calls, LocationCall::StopLocation);
        state.location_active = false;
    }
}

/// Mock camera permission with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct MockCamera {
    pub status: CameraAuthorization,
}

impl MockCamera {
    pub fn new(status: CameraAuthorization) -> Self {
        Self { status }
    }
}

impl CameraPermission for MockCamera {
    fn authorization_status(&self) -> CameraAuthorization {
        self.status
    }
}

/// Calls recorded by [`MockArSession`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Run(WorldTrackingConfig),
    AddAnchor(AnchorId),
    SetRotation(AnchorId),
    RemoveAnchor(AnchorId),
    Pause,
}

#[derive(Debug)]
struct SessionState {
    supported: bool,
    run_failure: Option<String>,
    running: bool,
    next_anchor: u64,
    anchors: Vec<(AnchorId, Vec3, Quat)>,
    calls: VecDeque<SessionCall>,
}

/// Mock AR session keeping a flat list of anchors
#[derive(Debug, Clone)]
pub struct MockArSession {
    state: Arc<Mutex<SessionState>>,
}

impl MockArSession {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                supported: true,
                run_failure: None,
                running: false,
                next_anchor: 1,
                anchors: Vec::new(),
                calls: VecDeque::with_capacity(CALL_LOG_CAPACITY),
            })),
        }
    }

    pub fn unsupported(self) -> Self {
        lock(&self.state).supported = false;
        self
    }

    /// Make `run` fail with `message`
    pub fn failing_with(self, message: &str) -> Self {
        lock(&self.state).run_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        lock(&self.state).calls.iter().cloned().collect()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn anchor_count(&self) -> usize {
        lock(&self.state).anchors.len()
    }

    pub fn rotation_of(&self, anchor: AnchorId) -> Option<Quat> {
        lock(&self.state)
            .anchors
            .iter()
            .find(|(id, _, _)| *id == anchor)
            .map(|(_, _, rotation)| *rotation)
    }

    pub fn offset_of(&self, anchor: AnchorId) -> Option<Vec3> {
        lock(&self.state)
            .anchors
            .iter()
            .find(|(id, _, _)| *id == anchor)
            .map(|(_, offset, _)| *offset)
    }
}

impl Default for MockArSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ArSession for MockArSession {
    fn is_world_tracking_supported(&self) -> bool {
        lock(&self.state).supported
    }

    fn run(&mut self, config: &WorldTrackingConfig) -> Result<(), SessionRunError> {
        let mut state = lock(&self.state);
        record(&mut state.calls, SessionCall::Run(*config));
        if let Some(message) = state.run_failure.clone() {
            return Err(SessionRunError::new(message));
        }
        state.running = true;
        Ok(())
    }

    fn add_anchor(&mut self, offset: Vec3, _mesh: &IndicatorMesh) -> AnchorId {
        let mut state = lock(&self.state);
        let id = AnchorId(state.next_anchor);
        state.next_anchor += 1;
        state.anchors.push((id, offset, Quat::IDENTITY));
        record(&mut state.calls, SessionCall::AddAnchor(id));
        id
    }

    fn set_rotation(&mut self, anchor: AnchorId, rotation: Quat) {
        let mut state = lock(&self.state);
        record(&mut state.calls, SessionCall::SetRotation(anchor));
        if let Some(entry) = state.anchors.iter_mut().find(|(id, _, _)| *id == anchor) {
            entry.2 = rotation;
        }
    }

    fn remove_anchor(&mut self, anchor: AnchorId) {
        let mut state = lock(&self.state);
        record(&mut state.calls, SessionCall::RemoveAnchor(anchor));
        state.anchors.retain(|(id, _, _)| *id != anchor);
    }

    fn pause(&mut self) {
        let mut state = lock(&self.state);
        record(&mut state.calls, SessionCall::Pause);
        state.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_call_log_is_bounded() {
        let mut session = MockArSession::new();
        session.run(&WorldTrackingConfig::heading_aligned()).unwrap();
        let anchor = session.add_anchor(Vec3::NEG_Z, &IndicatorMesh::default());

        for _ in 0..10_000 {
            session.set_rotation(anchor, Quat::IDENTITY);
        }

        let calls = session.calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        assert_eq!(calls.last(), Some(&SessionCall::SetRotation(anchor)));
        // Oldest entries were evicted first
        assert!(!calls.contains(&SessionCall::AddAnchor(anchor)));
    }

    #[test]
    fn test_location_call_log_is_bounded() {
        let mut service = MockLocationService::new(AuthorizationState::AuthorizedWhenInUse);
        for _ in 0..(CALL_LOG_CAPACITY * 3) {
            service.start_updating_heading();
            service.stop_updating_heading();
        }

        assert_eq!(service.calls().len(), CALL_LOG_CAPACITY);
        assert!(!service.heading_active());
    }
}
