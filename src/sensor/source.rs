use std::fmt;
use std::ops::ControlFlow;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::types::TimestampedSample;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SensorChannel {
    Accelerometer,
    Gyroscope,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 2] = [SensorChannel::Accelerometer, SensorChannel::Gyroscope];

    fn index(&self) -> usize {
        match self {
            SensorChannel::Accelerometer => 0,
            SensorChannel::Gyroscope => 1,
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorChannel::Accelerometer => f.write_str("accelerometer"),
            SensorChannel::Gyroscope => f.write_str("gyroscope"),
        }
    }
}

/// Opaque token returned by `subscribe`. Its only use is `unsubscribe`.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
    channel: SensorChannel,
}

/// Returning `ControlFlow::Break` drops the subscription before the next sample.
pub type SampleCallback = Box<dyn FnMut(TimestampedSample) -> ControlFlow<()>>;

/// Source of timestamped accelerometer and gyroscope samples
pub trait SensorSource {
    fn set_update_interval(&mut self, channel: SensorChannel, interval: Duration);
    fn is_available(&self, channel: SensorChannel) -> bool;
    fn subscribe(&mut self, channel: SensorChannel, callback: SampleCallback) -> SubscriptionHandle;
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

/// Control messages sent back to the feed thread
#[derive(Clone, Debug, PartialEq)]
pub enum SensorControl {
    UpdateInterval { channel: SensorChannel, interval_ms: u64 },
}

struct Feed {
    receiver: Option<Receiver<TimestampedSample>>,
    connected: bool,
    interval: Duration,
    subscribers: Vec<(u64, SampleCallback)>,
    last_timestamp: Option<i64>,
    received: u64,
}

impl Feed {
    fn new(receiver: Option<Receiver<TimestampedSample>>) -> Self {
        Self {
            connected: receiver.is_some(),
            receiver,
            interval: Duration::from_millis(100),
            subscribers: Vec::new(),
            last_timestamp: None,
            received: 0,
        }
    }
}

/// Sensor source fed through crossbeam channels by a feed thread.
///
/// Samples are buffered in the channels and dispatched on the caller's
/// thread by `pump()`, so subscribers run one at a time in arrival order.
pub struct ChannelSensorSource {
    feeds: [Feed; 2],
    control_sender: Option<Sender<SensorControl>>,
    next_id: u64,
}

impl ChannelSensorSource {
    /// A `None` receiver means the device has no such sensor.
    pub fn new(
        accelerometer: Option<Receiver<TimestampedSample>>,
        gyroscope: Option<Receiver<TimestampedSample>>,
        control_sender: Option<Sender<SensorControl>>,
    ) -> Self {
        Self {
            feeds: [Feed::new(accelerometer), Feed::new(gyroscope)],
            control_sender,
            next_id: 1,
        }
    }

    /// Drain pending samples and hand them to subscribers. Returns the number
    /// of samples taken off the channels.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;

        for channel in SensorChannel::ALL {
            let feed = &mut self.feeds[channel.index()];
            let Some(receiver) = feed.receiver.as_ref() else {
                continue;
            };

            loop {
                match receiver.try_recv() {
                    Ok(sample) => {
                        processed += 1;
                        feed.received += 1;
                        feed.last_timestamp = Some(sample.timestamp);
                        // no subscriber: the sample is discarded
                        feed.subscribers.retain_mut(|(id, callback)| {
                            let keep = callback(sample).is_continue();
                            if !keep {
                                debug!("{} subscription {} ended by its callback", channel, id);
                            }
                            keep
                        });
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if feed.connected {
                            warn!("{} feed disconnected, marking sensor unavailable", channel);
                        }
                        feed.connected = false;
                        break;
                    }
                }
            }
        }

        processed
    }

    pub fn subscriber_count(&self, channel: SensorChannel) -> usize {
        self.feeds[channel.index()].subscribers.len()
    }

    pub fn update_interval(&self, channel: SensorChannel) -> Duration {
        self.feeds[channel.index()].interval
    }

    pub fn last_timestamp(&self, channel: SensorChannel) -> Option<i64> {
        self.feeds[channel.index()].last_timestamp
    }

    pub fn received(&self, channel: SensorChannel) -> u64 {
        self.feeds[channel.index()].received
    }
}

impl SensorSource for ChannelSensorSource {
    fn set_update_interval(&mut self, channel: SensorChannel, interval: Duration) {
        self.feeds[channel.index()].interval = interval;

        if let Some(sender) = &self.control_sender {
            let control = SensorControl::UpdateInterval {
                channel,
                interval_ms: interval.as_millis() as u64,
            };
            if let Err(e) = sender.try_send(control) {
                warn!("Failed to forward {} update interval to feed: {}", channel, e);
            }
        }
        info!("{} update interval set to {}ms", channel, interval.as_millis());
    }

    fn is_available(&self, channel: SensorChannel) -> bool {
        self.feeds[channel.index()].connected
    }

    fn subscribe(&mut self, channel: SensorChannel, callback: SampleCallback) -> SubscriptionHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.feeds[channel.index()].subscribers.push((id, callback));
        debug!("{} subscription {} added", channel, id);
        SubscriptionHandle { id, channel }
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        let feed = &mut self.feeds[handle.channel.index()];
        let before = feed.subscribers.len();
        feed.subscribers.retain(|(id, _)| *id != handle.id);
        if feed.subscribers.len() != before {
            debug!("{} subscription {} removed", handle.channel, handle.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn source_with_senders() -> (
        ChannelSensorSource,
        Sender<TimestampedSample>,
        Sender<TimestampedSample>,
        Receiver<SensorControl>,
    ) {
        let (acc_tx, acc_rx) = crossbeam_channel::unbounded();
        let (gyro_tx, gyro_rx) = crossbeam_channel::unbounded();
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let source = ChannelSensorSource::new(Some(acc_rx), Some(gyro_rx), Some(control_tx));
        (source, acc_tx, gyro_tx, control_rx)
    }

    #[test]
    fn samples_are_dispatched_in_arrival_order() {
        let (mut source, acc_tx, _gyro_tx, _control) = source_with_senders();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _handle = source.subscribe(
            SensorChannel::Accelerometer,
            Box::new(move |sample| {
                sink.borrow_mut().push(sample.timestamp);
                ControlFlow::Continue(())
            }),
        );

        for t in [10, 20, 30] {
            acc_tx.send(TimestampedSample::new(0.0, 0.0, 9.8, t)).unwrap();
        }
        assert_eq!(source.pump(), 3);
        assert_eq!(*seen.borrow(), vec![10, 20, 30]);
        assert_eq!(source.last_timestamp(SensorChannel::Accelerometer), Some(30));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut source, _acc_tx, gyro_tx, _control) = source_with_senders();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let handle = source.subscribe(
            SensorChannel::Gyroscope,
            Box::new(move |_| {
                *counter.borrow_mut() += 1;
                ControlFlow::Continue(())
            }),
        );

        gyro_tx.send(TimestampedSample::new(1.0, 0.0, 0.0, 1)).unwrap();
        source.pump();
        source.unsubscribe(handle);
        gyro_tx.send(TimestampedSample::new(1.0, 0.0, 0.0, 2)).unwrap();
        source.pump();

        assert_eq!(*count.borrow(), 1);
        assert_eq!(source.subscriber_count(SensorChannel::Gyroscope), 0);
    }

    #[test]
    fn break_removes_subscription_immediately() {
        let (mut source, acc_tx, _gyro_tx, _control) = source_with_senders();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let _handle = source.subscribe(
            SensorChannel::Accelerometer,
            Box::new(move |_| {
                *counter.borrow_mut() += 1;
                ControlFlow::Break(())
            }),
        );

        for t in 0..5 {
            acc_tx.send(TimestampedSample::new(0.0, 0.0, 9.8, t)).unwrap();
        }
        source.pump();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(source.subscriber_count(SensorChannel::Accelerometer), 0);
    }

    #[test]
    fn missing_or_disconnected_feed_is_unavailable() {
        let (acc_tx, acc_rx) = crossbeam_channel::unbounded::<TimestampedSample>();
        let mut source = ChannelSensorSource::new(Some(acc_rx), None, None);
        assert!(source.is_available(SensorChannel::Accelerometer));
        assert!(!source.is_available(SensorChannel::Gyroscope));

        drop(acc_tx);
        source.pump();
        assert!(!source.is_available(SensorChannel::Accelerometer));
    }

    #[test]
    fn update_interval_is_forwarded_to_feed() {
        let (mut source, _acc, _gyro, control_rx) = source_with_senders();
        source.set_update_interval(SensorChannel::Gyroscope, Duration::from_millis(50));
        assert_eq!(source.update_interval(SensorChannel::Gyroscope), Duration::from_millis(50));
        assert_eq!(
            control_rx.try_recv().unwrap(),
            SensorControl::UpdateInterval {
                channel: SensorChannel::Gyroscope,
                interval_ms: 50
            }
        );
    }
}
