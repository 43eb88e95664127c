use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::authorization::AuthorizationState;
use crate::bearing::normalize_degrees;

/// Compass reading, degrees clockwise from true north
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingSample {
    pub true_heading_deg: f64,
    /// Max deviation in degrees; negative means the reading is invalid
    pub accuracy_deg: f64,
    pub timestamp: f64,
}

impl HeadingSample {
    pub fn new(true_heading_deg: f64, timestamp: f64) -> Self {
        Self {
            true_heading_deg: normalize_degrees(true_heading_deg),
            accuracy_deg: 0.0,
            timestamp,
        }
    }

    pub fn with_accuracy(mut self, accuracy_deg: f64) -> Self {
        self.accuracy_deg = accuracy_deg;
        self
    }
}

/// Position fix. Only displayed, never used for bearing math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub timestamp: f64,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: 0.0,
            timestamp,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = accuracy_m;
        self
    }
}

/// Platform callbacks, delivered to a single serialized handler
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    HeadingUpdated(HeadingSample),
    PositionUpdated(PositionSample),
    /// Several fixes in one callback, oldest first
    PositionsUpdated(Vec<PositionSample>),
    AuthorizationChanged(AuthorizationState),
    SensorError(String),
}

/// Simulated compass + GPS feed for running without hardware.
///
/// Sweeps the heading by `step_deg` every 20ms and, once per second, emits a
/// batch of position fixes around `origin` the way platforms coalesce them.
/// Samples are dropped when the channel is full.
pub async fn simulated_heading_loop(tx: Sender<SensorEvent>, origin: (f64, f64), step_deg: f64) {
    let mut interval = interval(Duration::from_millis(20)); // ~50Hz
    let mut heading = 0.0;
    let mut tick = 0u64;
    let mut dropped = 0u64;

    loop {
        interval.tick().await;
        tick += 1;

        heading = normalize_degrees(heading + step_deg);
        let mut events = vec![SensorEvent::HeadingUpdated(
            HeadingSample::new(heading, current_timestamp()).with_accuracy(5.0),
        )];

        if tick % 50 == 0 {
            // Small drift so the display visibly changes
            let now = current_timestamp();
            let fix = |t: u64, timestamp: f64| {
                let jitter = (t as f64 * 0.01).sin() * 1e-4;
                PositionSample::new(origin.0 + jitter, origin.1 - jitter, timestamp)
                    .with_accuracy(8.0)
            };
            events.push(SensorEvent::PositionsUpdated(vec![
                fix(tick - 25, now - 0.5),
                fix(tick, now),
            ]));
        }

        for event in events {
            match tx.try_send(event) {
                Ok(_) => {}
                Err(TrySendError::Closed(_)) => {
                    log::debug!("[sim] channel closed after {} ticks ({} dropped)", tick, dropped);
                    return;
                }
                Err(TrySendError::Full(_)) => {
                    // Latest-wins consumer, a dropped sample is harmless
                    dropped += 1;
                }
            }
        }
    }
}

pub fn current_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_heading_sample_is_normalized() {
        assert_eq!(HeadingSample::new(370.0, 0.0).true_heading_deg, 10.0);
        assert_eq!(HeadingSample::new(-10.0, 0.0).true_heading_deg, 350.0);
    }

    #[tokio::test]
    async fn test_simulated_loop_emits_headings_and_stops_on_close() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = tokio::spawn(simulated_heading_loop(tx, (51.5, -0.12), 10.0));

        let first = rx.recv().await;
        match first {
            Some(SensorEvent::HeadingUpdated(sample)) => {
                assert_eq!(sample.true_heading_deg, 10.0);
            }
            other => panic!("unexpected event {:?}", other),
        }

        drop(rx);
        handle.await.unwrap();
    }
}
