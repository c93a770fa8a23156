use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TrySendError};
use log::{debug, info};
use rand::Rng;

use super::{SensorChannel, SensorControl, SensorSenders};
use crate::types::{TimestampedSample, Vector3};
use crate::utils::now_millis;

const GRAVITY: f64 = 9.81;
const CYCLE_SECONDS: f64 = 6.0;
const SWING_SECONDS: f64 = 2.0;
const PEAK_OMEGA: f64 = 12.0;

/// Synthesized device pose at `t` seconds: at rest for most of each cycle,
/// then a swing whose angular speed follows a half sine.
pub fn simulated_reading<R: Rng>(t: f64, rng: &mut R) -> (Vector3, Vector3) {
    let phase = t % CYCLE_SECONDS;

    let omega = if phase < SWING_SECONDS {
        PEAK_OMEGA * (std::f64::consts::PI * phase / SWING_SECONDS).sin()
    } else {
        0.0
    };

    // centripetal load on the handle while swinging
    let swing_accel = omega * omega * 0.15;
    let accel = Vector3::new(
        swing_accel + noise(rng),
        noise(rng),
        GRAVITY + noise(rng),
    );
    let gyro = Vector3::new(noise(rng), noise(rng), omega + noise(rng));

    (accel, gyro)
}

/// Feed thread used when no device is connected
pub fn run_simulated_feed(
    senders: SensorSenders,
    control_receiver: Receiver<SensorControl>,
    shutdown_signal: Arc<AtomicBool>,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::rng();
    let started = Instant::now();
    let mut intervals = [interval, interval];
    let mut next_due = [Instant::now(), Instant::now()];

    info!("Simulated sensor feed started ({}ms)", interval.as_millis());

    while !shutdown_signal.load(Ordering::Relaxed) {
        while let Ok(control) = control_receiver.try_recv() {
            match control {
                SensorControl::UpdateInterval { channel, interval_ms } => {
                    let slot = channel_slot(channel);
                    intervals[slot] = Duration::from_millis(interval_ms.max(1));
                    info!("Simulated {} interval now {}ms", channel, interval_ms);
                }
            }
        }

        let now = Instant::now();
        let t = now.duration_since(started).as_secs_f64();
        let (accel, gyro) = simulated_reading(t, &mut rng);
        let timestamp = now_millis();

        for (channel, vector) in [(SensorChannel::Accelerometer, accel), (SensorChannel::Gyroscope, gyro)] {
            let slot = channel_slot(channel);
            if now < next_due[slot] {
                continue;
            }
            next_due[slot] = now + intervals[slot];

            let sample = TimestampedSample {
                vector,
                timestamp,
            };
            match senders.sender_for(channel).try_send(sample) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("{} channel full, dropping simulated sample", channel),
                Err(TrySendError::Disconnected(_)) => {
                    info!("Sensor channel disconnected, simulated feed exiting");
                    return Ok(());
                }
            }
        }

        let wake = next_due[0].min(next_due[1]);
        let sleep_for = wake.saturating_duration_since(Instant::now()).min(Duration::from_millis(20));
        thread::sleep(sleep_for);
    }

    info!("Simulated sensor feed received shutdown signal");
    Ok(())
}

fn noise<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(-0.03..0.03)
}

fn channel_slot(channel: SensorChannel) -> usize {
    match channel {
        SensorChannel::Accelerometer => 0,
        SensorChannel::Gyroscope => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_is_still_outside_the_swing() {
        let mut rng = rand::rng();
        let (accel, gyro) = simulated_reading(4.0, &mut rng);
        assert!(gyro.magnitude() < 0.1);
        assert!((accel.magnitude() - GRAVITY).abs() < 0.1);
    }

    #[test]
    fn swing_peaks_mid_window() {
        let mut rng = rand::rng();
        let (_, gyro) = simulated_reading(SWING_SECONDS / 2.0, &mut rng);
        assert!((gyro.magnitude() - PEAK_OMEGA).abs() < 0.2);
    }

    #[test]
    fn feed_exits_when_channels_close() {
        let (acc_tx, acc_rx) = crossbeam_channel::bounded(4);
        let (gyro_tx, gyro_rx) = crossbeam_channel::bounded(4);
        let (_control_tx, control_rx) = crossbeam_channel::bounded(1);
        drop(acc_rx);
        drop(gyro_rx);

        let senders = SensorSenders {
            accelerometer: acc_tx,
            gyroscope: gyro_tx,
        };
        let result = run_simulated_feed(
            senders,
            control_rx,
            Arc::new(AtomicBool::new(false)),
            Duration::from_millis(5),
        );
        assert!(result.is_ok());
    }
}
