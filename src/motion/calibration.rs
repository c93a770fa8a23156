use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use super::GravityCell;
use crate::database::{KeyValueStore, StoreError};
use crate::sensor::{SensorChannel, SensorSource, SubscriptionHandle};
use crate::types::Vector3;

pub const GRAVITY_OFFSET_KEY: &str = "gravityOffset";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Accelerometer is not available on this device")]
    SensorUnavailable,

    #[error("Calibration is already in progress")]
    AlreadyInProgress,
}

/// Where a calibration stands after `poll`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationStatus {
    Idle,
    WaitingForSample,
    Settling { remaining: Duration },
    Completed(Vector3),
}

type Capture = Rc<Cell<Option<(Vector3, Instant)>>>;

struct Pending {
    capture: Capture,
    handle: Option<SubscriptionHandle>,
}

/// Captures the device at rest as the gravity offset.
///
/// The first accelerometer sample after `calibrate` is taken and the
/// subscription ends from inside the callback, so later samples queued on
/// the source can never overwrite it. After the settle interval `poll`
/// commits the offset to the shared cell and persists it.
pub struct GravityCalibrator {
    gravity: GravityCell,
    settle: Duration,
    pending: Option<Pending>,
}

impl GravityCalibrator {
    pub fn new(gravity: GravityCell, settle: Duration) -> Self {
        Self {
            gravity,
            settle,
            pending: None,
        }
    }

    pub fn calibrate(&mut self, source: &mut dyn SensorSource) -> Result<(), CalibrationError> {
        if self.pending.is_some() {
            return Err(CalibrationError::AlreadyInProgress);
        }
        if !source.is_available(SensorChannel::Accelerometer) {
            warn!("Calibration requested but accelerometer is unavailable");
            return Err(CalibrationError::SensorUnavailable);
        }

        let capture: Capture = Rc::new(Cell::new(None));
        let slot = Rc::clone(&capture);
        let handle = source.subscribe(
            SensorChannel::Accelerometer,
            Box::new(move |sample| {
                if !sample.vector.is_finite() {
                    debug!("Calibration skipping non-finite sample at {}", sample.timestamp);
                    return ControlFlow::Continue(());
                }
                if slot.get().is_none() {
                    slot.set(Some((sample.vector, Instant::now())));
                }
                ControlFlow::Break(())
            }),
        );

        self.pending = Some(Pending {
            capture,
            handle: Some(handle),
        });
        info!("Calibration started, waiting for a resting sample");
        Ok(())
    }

    /// Advance a pending calibration. On completion the offset is written to
    /// the gravity cell and to `store`; a failed write is logged only.
    pub fn poll(&mut self, now: Instant, store: &dyn KeyValueStore) -> CalibrationStatus {
        let Some(pending) = self.pending.as_ref() else {
            return CalibrationStatus::Idle;
        };
        let Some((offset, captured_at)) = pending.capture.get() else {
            return CalibrationStatus::WaitingForSample;
        };

        let elapsed = now.saturating_duration_since(captured_at);
        if elapsed < self.settle {
            return CalibrationStatus::Settling {
                remaining: self.settle - elapsed,
            };
        }

        self.pending = None;
        self.gravity.set(offset);
        info!(
            "Calibration complete: offset ({:.3}, {:.3}, {:.3})",
            offset.x, offset.y, offset.z
        );

        if let Err(e) = save_gravity_offset(store, offset) {
            error!("Failed to persist gravity offset: {}", e);
        }

        CalibrationStatus::Completed(offset)
    }

    /// Abandon a pending calibration; the previous offset stays in effect
    pub fn cancel(&mut self, source: &mut dyn SensorSource) {
        if let Some(mut pending) = self.pending.take() {
            if let Some(handle) = pending.handle.take() {
                source.unsubscribe(handle);
            }
            info!("Calibration cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fraction of the settle interval elapsed, `None` when idle or not yet captured
    pub fn progress(&self, now: Instant) -> Option<f32> {
        let (_, captured_at) = self.pending.as_ref()?.capture.get()?;
        if self.settle.is_zero() {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(captured_at);
        Some((elapsed.as_secs_f32() / self.settle.as_secs_f32()).min(1.0))
    }

    pub fn gravity(&self) -> &GravityCell {
        &self.gravity
    }
}

/// Absent or unreadable entries mean "not calibrated"
pub fn load_gravity_offset(store: &dyn KeyValueStore) -> Option<Vector3> {
    let raw = match store.get(GRAVITY_OFFSET_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read gravity offset: {}", e);
            return None;
        }
    };

    match serde_json::from_str::<Vector3>(&raw) {
        Ok(offset) if offset.is_finite() => Some(offset),
        Ok(_) => {
            warn!("Stored gravity offset is not finite, ignoring");
            None
        }
        Err(e) => {
            warn!("Stored gravity offset is malformed, ignoring: {}", e);
            None
        }
    }
}

/// Persisted as `{"x":..,"y":..,"z":..}`
pub fn save_gravity_offset(store: &dyn KeyValueStore, offset: Vector3) -> Result<(), StoreError> {
    let json = serde_json::to_string(&offset).map_err(|e| StoreError::Database(e.to_string()))?;
    store.set(GRAVITY_OFFSET_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::sensor::ChannelSensorSource;
    use crate::types::TimestampedSample;
    use crossbeam_channel::{unbounded, Sender};

    fn source() -> (ChannelSensorSource, Sender<TimestampedSample>) {
        let (acc_tx, acc_rx) = unbounded();
        (ChannelSensorSource::new(Some(acc_rx), None, None), acc_tx)
    }

    #[test]
    fn first_sample_only_is_committed() {
        let (mut source, acc_tx) = source();
        let store = MemoryStore::new();
        let gravity = GravityCell::new(None);
        let settle = Duration::from_millis(3000);
        let mut calibrator = GravityCalibrator::new(gravity.clone(), settle);

        calibrator.calibrate(&mut source).unwrap();
        assert_eq!(calibrator.poll(Instant::now(), &store), CalibrationStatus::WaitingForSample);

        acc_tx.send(TimestampedSample::new(0.1, 0.2, 9.8, 1)).unwrap();
        acc_tx.send(TimestampedSample::new(5.0, 5.0, 5.0, 2)).unwrap();
        acc_tx.send(TimestampedSample::new(7.0, 7.0, 7.0, 3)).unwrap();
        source.pump();
        assert_eq!(source.subscriber_count(SensorChannel::Accelerometer), 0);

        assert!(matches!(
            calibrator.poll(Instant::now(), &store),
            CalibrationStatus::Settling { .. }
        ));
        assert!(!gravity.is_calibrated());

        let expected = Vector3::new(0.1, 0.2, 9.8);
        let status = calibrator.poll(Instant::now() + settle, &store);
        assert_eq!(status, CalibrationStatus::Completed(expected));
        assert_eq!(gravity.get(), Some(expected));
        assert!(!calibrator.is_pending());
        assert_eq!(load_gravity_offset(&store), Some(expected));
    }

    #[test]
    fn non_finite_sample_is_not_captured() {
        let (mut source, acc_tx) = source();
        let store = MemoryStore::new();
        let gravity = GravityCell::new(None);
        let settle = Duration::from_millis(3000);
        let mut calibrator = GravityCalibrator::new(gravity.clone(), settle);

        calibrator.calibrate(&mut source).unwrap();
        acc_tx.send(TimestampedSample::new(f64::NAN, 0.0, 9.8, 1)).unwrap();
        source.pump();
        assert_eq!(source.subscriber_count(SensorChannel::Accelerometer), 1);
        assert_eq!(calibrator.poll(Instant::now(), &store), CalibrationStatus::WaitingForSample);

        acc_tx.send(TimestampedSample::new(0.0, 0.0, 9.8, 2)).unwrap();
        source.pump();
        assert_eq!(source.subscriber_count(SensorChannel::Accelerometer), 0);

        let expected = Vector3::new(0.0, 0.0, 9.8);
        assert_eq!(
            calibrator.poll(Instant::now() + settle, &store),
            CalibrationStatus::Completed(expected)
        );
        assert_eq!(gravity.get(), Some(expected));
        assert_eq!(load_gravity_offset(&store), Some(expected));
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let (mut source, _acc_tx) = source();
        let mut calibrator = GravityCalibrator::new(GravityCell::default(), Duration::from_secs(3));
        calibrator.calibrate(&mut source).unwrap();
        assert_eq!(calibrator.calibrate(&mut source), Err(CalibrationError::AlreadyInProgress));
        assert_eq!(source.subscriber_count(SensorChannel::Accelerometer), 1);
    }

    #[test]
    fn unavailable_accelerometer_is_reported() {
        let mut source = ChannelSensorSource::new(None, None, None);
        let mut calibrator = GravityCalibrator::new(GravityCell::default(), Duration::from_secs(3));
        assert_eq!(calibrator.calibrate(&mut source), Err(CalibrationError::SensorUnavailable));
        assert!(!calibrator.is_pending());
    }

    #[test]
    fn cancel_keeps_previous_offset() {
        let (mut source, acc_tx) = source();
        let previous = Vector3::new(0.0, 0.0, 9.7);
        let gravity = GravityCell::new(Some(previous));
        let mut calibrator = GravityCalibrator::new(gravity.clone(), Duration::ZERO);

        calibrator.calibrate(&mut source).unwrap();
        calibrator.cancel(&mut source);
        acc_tx.send(TimestampedSample::new(1.0, 1.0, 1.0, 1)).unwrap();
        source.pump();

        assert_eq!(calibrator.poll(Instant::now(), &MemoryStore::new()), CalibrationStatus::Idle);
        assert_eq!(gravity.get(), Some(previous));
    }

    #[test]
    fn malformed_stored_offset_reads_as_uncalibrated() {
        let store = MemoryStore::new();
        assert_eq!(load_gravity_offset(&store), None);
        store.set(GRAVITY_OFFSET_KEY, "{\"x\":1}").unwrap();
        assert_eq!(load_gravity_offset(&store), None);
        store.set(GRAVITY_OFFSET_KEY, "{\"x\":0.0,\"y\":0.5,\"z\":9.8}").unwrap();
        assert_eq!(load_gravity_offset(&store), Some(Vector3::new(0.0, 0.5, 9.8)));
    }
}
