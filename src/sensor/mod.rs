pub mod source;
pub mod simulator;

pub use source::{ChannelSensorSource, SampleCallback, SensorChannel, SensorControl, SensorSource, SubscriptionHandle};
pub use simulator::run_simulated_feed;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::types::TimestampedSample;

/// Feed-thread side of the sensor channels
#[derive(Clone)]
pub struct SensorSenders {
    pub accelerometer: Sender<TimestampedSample>,
    pub gyroscope: Sender<TimestampedSample>,
}

impl SensorSenders {
    pub fn sender_for(&self, channel: SensorChannel) -> &Sender<TimestampedSample> {
        match channel {
            SensorChannel::Accelerometer => &self.accelerometer,
            SensorChannel::Gyroscope => &self.gyroscope,
        }
    }
}

/// Wire up a `ChannelSensorSource` with the senders a feed thread writes to
/// and the control receiver it reads interval changes from.
pub fn sensor_channels(capacity: usize) -> (SensorSenders, ChannelSensorSource, Receiver<SensorControl>) {
    let (acc_tx, acc_rx) = bounded(capacity);
    let (gyro_tx, gyro_rx) = bounded(capacity);
    let (control_tx, control_rx) = bounded(16);

    let senders = SensorSenders {
        accelerometer: acc_tx,
        gyroscope: gyro_tx,
    };
    let source = ChannelSensorSource::new(Some(acc_rx), Some(gyro_rx), Some(control_tx));

    (senders, source, control_rx)
}
