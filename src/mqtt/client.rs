use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TrySendError};
use dotenv::dotenv;
use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Packet, QoS, RecvTimeoutError};

use crate::config::{MqttConfig, MqttTopics};
use crate::sensor::{SensorChannel, SensorControl, SensorSenders};
use crate::types::TimestampedSample;

pub fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Build the MQTT client pair. Host, port and credentials in `.env`
/// (`MQTT_HOST`, `MQTT_PORT`, `MQTT_USER`, `MQTT_PASS`) override the config.
pub fn connect(config: &MqttConfig) -> Result<(Client, Connection), Box<dyn std::error::Error>> {
    dotenv().ok();

    let mqtt_host = env::var("MQTT_HOST").unwrap_or_else(|_| config.broker.clone());
    let mqtt_port = match env::var("MQTT_PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => config.port,
    };

    let mut mqtt_options = MqttOptions::new(config.client_id.clone(), mqtt_host.clone(), mqtt_port);
    if let (Ok(user), Ok(pass)) = (env::var("MQTT_USER"), env::var("MQTT_PASS")) {
        mqtt_options.set_credentials(user, pass);
    }
    mqtt_options
        .set_keep_alive(Duration::from_secs(config.keep_alive.max(1) as u64))
        .set_last_will(LastWill::new(
            config.topics.control.clone(),
            "offline",
            QoS::AtLeastOnce,
            false,
        ));

    info!("Connecting to MQTT broker {}:{}", mqtt_host, mqtt_port);
    Ok(Client::new(mqtt_options, 10))
}

/// Feed thread for a phone publishing its sensors over MQTT. Samples go to
/// the sensor channels; interval changes from the UI go to the control topic.
pub fn run_mqtt_feed(
    client: Client,
    mut connection: Connection,
    topics: MqttTopics,
    qos: QoS,
    senders: SensorSenders,
    control_receiver: Receiver<SensorControl>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    client.subscribe(topics.accelerometer.as_str(), qos)?;
    client.subscribe(topics.gyroscope.as_str(), qos)?;

    while !shutdown_signal.load(Ordering::Relaxed) {
        while let Ok(control) = control_receiver.try_recv() {
            publish_control(&client, &topics.control, &control);
        }

        let event = match connection.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("MQTT event loop closed, feed exiting");
                break;
            }
        };

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let channel = if publish.topic == topics.accelerometer {
                    SensorChannel::Accelerometer
                } else if publish.topic == topics.gyroscope {
                    SensorChannel::Gyroscope
                } else {
                    continue;
                };

                match parse_sample(&publish.payload) {
                    Ok(sample) => match senders.sender_for(channel).try_send(sample) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => debug!("{} channel full, dropping sample", channel),
                        Err(TrySendError::Disconnected(_)) => {
                            info!("Sensor channel disconnected, MQTT feed exiting");
                            break;
                        }
                    },
                    Err(e) => warn!("Invalid {} payload: {}", channel, e),
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                return Err(e.into());
            }
        }
    }

    if shutdown_signal.load(Ordering::Relaxed) {
        info!("MQTT feed received shutdown signal, exiting gracefully");
    }
    if let Err(e) = client.disconnect() {
        debug!("MQTT disconnect failed: {}", e);
    }
    Ok(())
}

fn publish_control(client: &Client, topic: &str, control: &SensorControl) {
    let payload = match control {
        SensorControl::UpdateInterval { channel, interval_ms } => serde_json::json!({
            "channel": channel,
            "intervalMs": interval_ms,
        }),
    };

    if let Err(e) = client.try_publish(topic, QoS::AtLeastOnce, false, payload.to_string()) {
        warn!("Failed to publish sensor control: {}", e);
    }
}

/// Payload format: `{"x":..,"y":..,"z":..,"timestamp":..}`
pub fn parse_sample(payload: &[u8]) -> Result<TimestampedSample, String> {
    let payload_str = std::str::from_utf8(payload).map_err(|e| format!("Invalid UTF-8: {}", e))?;

    serde_json::from_str::<TimestampedSample>(payload_str).map_err(|e| format!("JSON parsing error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sensor_payload() {
        let sample = parse_sample(br#"{"x":0.1,"y":-0.2,"z":9.81,"timestamp":1700000000000}"#).unwrap();
        assert_eq!(sample, TimestampedSample::new(0.1, -0.2, 9.81, 1_700_000_000_000));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(parse_sample(b"\xff\xfe").is_err());
        assert!(parse_sample(br#"{"x":1,"y":2}"#).is_err());
        assert!(parse_sample(b"offline").is_err());
    }

    #[test]
    fn qos_levels() {
        assert_eq!(qos_from_level(0), QoS::AtMostOnce);
        assert_eq!(qos_from_level(1), QoS::AtLeastOnce);
        assert_eq!(qos_from_level(2), QoS::ExactlyOnce);
    }
}
