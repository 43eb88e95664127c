use std::sync::{Arc, Mutex, MutexGuard};

use crate::authorization::AuthorizationState;
use crate::error::{PResult, StarPointerError};
use crate::platform::{LocationAccuracy, LocationService};
use crate::sensors::{HeadingSample, PositionSample, SensorEvent};

#[derive(Debug, Default)]
struct Readings {
    heading: Option<HeadingSample>,
    position: Option<PositionSample>,
}

/// Latest heading/position pair shared between the sensor side and the
/// overlay. Writes overwrite, nothing is queued.
#[derive(Debug, Clone, Default)]
pub struct SharedReadings {
    inner: Arc<Mutex<Readings>>,
}

impl SharedReadings {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PResult<MutexGuard<'_, Readings>> {
        self.inner.lock().map_err(|_| {
            StarPointerError::Internal("Failed to acquire readings lock".to_string())
        })
    }

    pub fn latest_heading(&self) -> PResult<Option<HeadingSample>> {
        Ok(self.lock()?.heading)
    }

    pub fn latest_position(&self) -> PResult<Option<PositionSample>> {
        Ok(self.lock()?.position)
    }

    pub fn set_heading(&self, sample: HeadingSample) -> PResult<()> {
        self.lock()?.heading = Some(sample);
        Ok(())
    }

    pub fn set_position(&self, sample: PositionSample) -> PResult<()> {
        self.lock()?.position = Some(sample);
        Ok(())
    }

    pub fn clear(&self) -> PResult<()> {
        let mut readings = self.lock()?;
        readings.heading = None;
        readings.position = None;
        Ok(())
    }
}

/// Owns the compass/GPS subscription lifecycle.
///
/// Subscriptions are active exactly while authorization is granted and
/// location services are enabled. All mutation happens from the platform
/// callbacks (`on_*`), which the caller must deliver serially.
pub struct HeadingSource<L: LocationService> {
    service: L,
    readings: SharedReadings,
    authorization: AuthorizationState,
    desired_accuracy: LocationAccuracy,
    heading_filter_deg: f64,
    updating: bool,
    sensor_error_count: u64,
    last_sensor_error: Option<StarPointerError>,
}

impl<L: LocationService> HeadingSource<L> {
    pub fn new(
        service: L,
        readings: SharedReadings,
        desired_accuracy: LocationAccuracy,
        heading_filter_deg: f64,
    ) -> Self {
        let authorization = service.authorization_status();
        Self {
            service,
            readings,
            authorization,
            desired_accuracy,
            heading_filter_deg,
            updating: false,
            sensor_error_count: 0,
            last_sensor_error: None,
        }
    }

    /// Ask for permission if it was never asked, then start if allowed.
    pub fn initialize(&mut self) {
        if self.authorization == AuthorizationState::NotDetermined {
            log::info!("Requesting when-in-use location authorization");
            self.service.request_when_in_use_authorization();
        }
        self.evaluate_and_start();
    }

    /// Bring subscriptions in line with authorization and the global
    /// location switch. Safe to call repeatedly.
    pub fn evaluate_and_start(&mut self) {
        if !self.service.location_services_enabled() {
            log::debug!("Location services disabled, not starting updates");
            if self.updating {
                self.stop_updates();
            }
            return;
        }

        if self.authorization.is_authorized() {
            if self.updating {
                return;
            }
            self.service.set_desired_accuracy(self.desired_accuracy);
            self.service.set_heading_filter(self.heading_filter_deg);
            self.service.start_updating_heading();
            self.service.start_updating_location();
            self.updating = true;
            log::info!(
                "Heading and location updates started ({:?}, filter {:.1}°)",
                self.authorization,
                self.heading_filter_deg
            );
        } else if self.updating {
            self.stop_updates();
        }
    }

    pub fn on_authorization_changed(&mut self, state: AuthorizationState) {
        if state != self.authorization {
            log::info!("Location authorization {:?} -> {:?}", self.authorization, state);
        }
        self.authorization = state;
        self.evaluate_and_start();
    }

    /// Replace the latest heading. Ignored while not subscribed.
    ///
    /// Samples with negative accuracy (uncalibrated compass) are dropped
    /// here, so the display and the overlay both keep the last valid one.
    pub fn on_heading_update(&mut self, sample: HeadingSample) -> PResult<()> {
        if !self.updating {
            log::debug!("Dropping heading {:.1}° delivered while stopped", sample.true_heading_deg);
            return Ok(());
        }
        if sample.accuracy_deg < 0.0 {
            log::debug!("Dropping invalid heading {:.1}°", sample.true_heading_deg);
            return Ok(());
        }
        self.readings.set_heading(sample)
    }

    /// Replace the latest position. Ignored while not subscribed.
    pub fn on_position_update(&mut self, sample: PositionSample) -> PResult<()> {
        if !self.updating {
            return Ok(());
        }
        self.readings.set_position(sample)
    }

    /// Platforms may deliver several fixes at once; only the newest counts.
    pub fn on_position_batch(&mut self, samples: &[PositionSample]) -> PResult<()> {
        match samples.last() {
            Some(sample) => self.on_position_update(*sample),
            None => Ok(()),
        }
    }

    /// Transient, never changes authorization or subscriptions.
    pub fn on_sensor_error(&mut self, message: &str) {
        let error = StarPointerError::TransientSensor(message.to_string());
        self.sensor_error_count += 1;
        log::warn!("Location manager failed: {}", error);
        self.last_sensor_error = Some(error);
    }

    pub fn handle_event(&mut self, event: SensorEvent) -> PResult<()> {
        match event {
            SensorEvent::HeadingUpdated(sample) => self.on_heading_update(sample),
            SensorEvent::PositionUpdated(sample) => self.on_position_update(sample),
            SensorEvent::PositionsUpdated(samples) => self.on_position_batch(&samples),
            SensorEvent::AuthorizationChanged(state) => {
                self.on_authorization_changed(state);
                Ok(())
            }
            SensorEvent::SensorError(message) => {
                self.on_sensor_error(&message);
                Ok(())
            }
        }
    }

    /// Teardown: stop subscriptions regardless of authorization.
    pub fn stop(&mut self) {
        if self.updating {
            self.stop_updates();
        }
    }

    fn stop_updates(&mut self) {
        self.service.stop_updating_heading();
        self.service.stop_updating_location();
        self.updating = false;
        if let Err(e) = self.readings.clear() {
            log::error!("Failed to clear readings: {}", e);
        }
        log::info!("Heading and location updates stopped");
    }

    pub fn authorization_state(&self) -> AuthorizationState {
        self.authorization
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn readings(&self) -> &SharedReadings {
        &self.readings
    }

    pub fn latest_heading(&self) -> PResult<Option<HeadingSample>> {
        self.readings.latest_heading()
    }

    pub fn latest_position(&self) -> PResult<Option<PositionSample>> {
        self.readings.latest_position()
    }

    pub fn sensor_error_count(&self) -> u64 {
        self.sensor_error_count
    }

    pub fn last_sensor_error(&self) -> Option<&StarPointerError> {
        self.last_sensor_error.as_ref()
    }
}
