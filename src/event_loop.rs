//! Serialized delivery of platform callbacks and render ticks.
//!
//! Every sensor event and every overlay update runs on this one task, so the
//! heading source and the controller never need their own locking and the
//! per-tick update can never re-enter itself.

use tokio::sync::mpsc::Receiver;
use tokio::time::{interval, sleep, Duration, Instant};

use crate::error::PResult;
use crate::heading_source::HeadingSource;
use crate::overlay::BearingOverlayController;
use crate::platform::{ArSession, CameraPermission, LocationService};
use crate::sensors::SensorEvent;
use crate::status::PointerStatus;

/// Loop options
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub tick_interval: Duration,
    /// Stop after this long; `None` runs until the event channel closes
    pub duration: Option<Duration>,
    /// Emit a status line this often
    pub status_interval: Duration,
    /// Also write the status snapshot as JSON here
    pub status_file: Option<String>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            duration: None,
            status_interval: Duration::from_secs(1),
            status_file: None,
        }
    }
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopSummary {
    pub events: u64,
    pub ticks: u64,
    pub orientation_updates: u64,
    pub last_bearing_deg: Option<f64>,
}

/// Run startup for both components, then handle events and ticks until the
/// channel closes or the duration elapses. Both are torn down on exit.
///
/// A failed AR startup is not an error here: it is surfaced through the
/// controller's error message and the loop keeps feeding the heading display.
pub async fn run_event_loop<L, S, C>(
    mut events: Receiver<SensorEvent>,
    source: &mut HeadingSource<L>,
    overlay: &mut BearingOverlayController<S, C>,
    options: LoopOptions,
) -> PResult<LoopSummary>
where
    L: LocationService,
    S: ArSession,
    C: CameraPermission,
{
    source.initialize();
    if let Err(e) = overlay.start() {
        log::warn!("Overlay unavailable: {}", e.user_message());
    }

    let mut summary = LoopSummary::default();
    let mut ticker = interval(options.tick_interval);
    let mut last_status = Instant::now();
    let deadline = sleep(options.duration.unwrap_or(Duration::ZERO));
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            biased;

            _ = &mut deadline, if options.duration.is_some() => {
                log::info!("Duration reached, stopping");
                break Ok(());
            }
            event = events.recv() => {
                match event {
                    Some(event) => {
                        summary.events += 1;
                        if let Err(e) = source.handle_event(event) {
                            break Err(e);
                        }
                    }
                    None => {
                        log::info!("Sensor channel closed, stopping");
                        break Ok(());
                    }
                }
            }
            _ = ticker.tick() => {
                summary.ticks += 1;
                match overlay.update(source.readings()) {
                    Ok(Some(bearing)) => {
                        summary.orientation_updates += 1;
                        summary.last_bearing_deg = Some(bearing);
                    }
                    Ok(None) => {}
                    Err(e) => break Err(e),
                }

                if last_status.elapsed() >= options.status_interval {
                    last_status = Instant::now();
                    if let Err(e) = report_status(source, overlay, options.status_file.as_deref()) {
                        log::warn!("Status report failed: {}", e);
                    }
                }
            }
        }
    };

    overlay.teardown();
    source.stop();
    log::info!(
        "Event loop finished: {} events, {} ticks, {} orientation updates",
        summary.events,
        summary.ticks,
        summary.orientation_updates
    );

    result.map(|_| summary)
}

fn report_status<L, S, C>(
    source: &HeadingSource<L>,
    overlay: &BearingOverlayController<S, C>,
    status_file: Option<&str>,
) -> PResult<()>
where
    L: LocationService,
    S: ArSession,
    C: CameraPermission,
{
    let status = PointerStatus::capture(source, overlay)?;
    log::info!("{}", status.display_lines().join(" | "));
    if let Some(path) = status_file {
        status.save(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{AuthorizationState, CameraAuthorization};
    use crate::heading_source::SharedReadings;
    use crate::overlay::{IndicatorMesh, OverlayPhase};
    use crate::platform::mock::{MockArSession, MockCamera, MockLocationService};
    use crate::platform::LocationAccuracy;
    use crate::sensors::HeadingSample;
    use glam::Vec3;
    use tokio::sync::mpsc;

    fn components(
        service: &MockLocationService,
        session: &MockArSession,
        camera: CameraAuthorization,
    ) -> (
        HeadingSource<MockLocationService>,
        BearingOverlayController<MockArSession, MockCamera>,
    ) {
        let source = HeadingSource::new(
            service.clone(),
            SharedReadings::new(),
            LocationAccuracy::Best,
            1.0,
        );
        let overlay = BearingOverlayController::new(
            session.clone(),
            MockCamera::new(camera),
            0.0,
            Vec3::NEG_Z,
            IndicatorMesh::default(),
        );
        (source, overlay)
    }

    fn fast() -> LoopOptions {
        LoopOptions {
            tick_interval: Duration::from_millis(1),
            ..LoopOptions::default()
        }
    }

    #[tokio::test]
    async fn test_permission_grant_then_headings_drive_overlay() {
        let (tx, rx) = mpsc::channel(16);
        let service = MockLocationService::new(AuthorizationState::NotDetermined)
            .grant_on_request(AuthorizationState::AuthorizedWhenInUse)
            .with_event_sender(tx.clone());
        let session = MockArSession::new();
        let (mut source, mut overlay) =
            components(&service, &session, CameraAuthorization::Authorized);

        let feeder = tokio::spawn(async move {
            // Give the loop time to process the authorization callback
            sleep(Duration::from_millis(20)).await;
            tx.send(SensorEvent::HeadingUpdated(HeadingSample::new(350.0, 0.0)))
                .await
                .unwrap();
            sleep(Duration::from_millis(20)).await;
        });

        // The mock keeps a sender for authorization callbacks, so bound the run
        let options = LoopOptions {
            duration: Some(Duration::from_millis(100)),
            ..fast()
        };
        let summary = run_event_loop(rx, &mut source, &mut overlay, options)
            .await
            .unwrap();
        feeder.await.unwrap();

        let bearing = summary.last_bearing_deg.unwrap();
        assert!((bearing - 10.0).abs() < 1e-9);
        assert!(summary.orientation_updates > 0);

        // Torn down on exit
        assert_eq!(overlay.phase(), OverlayPhase::Stopped);
        assert!(!service.heading_active());
        assert_eq!(session.anchor_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_overlay_still_tracks_heading() {
        let (tx, rx) = mpsc::channel(16);
        let service = MockLocationService::new(AuthorizationState::AuthorizedAlways);
        let session = MockArSession::new();
        let (mut source, mut overlay) =
            components(&service, &session, CameraAuthorization::Denied);

        tx.send(SensorEvent::HeadingUpdated(HeadingSample::new(12.0, 0.0)))
            .await
            .unwrap();
        drop(tx);

        let summary = run_event_loop(rx, &mut source, &mut overlay, fast())
            .await
            .unwrap();

        assert_eq!(summary.events, 1);
        assert_eq!(summary.orientation_updates, 0);
        assert_eq!(overlay.error_message().as_deref(), Some("camera access required"));
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duration_bounds_the_loop() {
        let (_tx, rx) = mpsc::channel::<SensorEvent>(1);
        let service = MockLocationService::new(AuthorizationState::AuthorizedAlways);
        let session = MockArSession::new();
        let (mut source, mut overlay) =
            components(&service, &session, CameraAuthorization::Authorized);

        let options = LoopOptions {
            duration: Some(Duration::from_millis(30)),
            ..fast()
        };
        let summary = run_event_loop(rx, &mut source, &mut overlay, options)
            .await
            .unwrap();

        assert_eq!(summary.events, 0);
        assert!(summary.ticks > 0);
        assert!(!service.heading_active());
    }
}
