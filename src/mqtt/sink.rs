use log::{error, info};
use rumqttc::{Client, QoS};

use crate::types::{ResultPath, UploadRecord};
use crate::upload::ResultSink;

/// Publishes each result as JSON to `{prefix}/{grade}/{flail}`.
/// Publishing is queued on the client, never awaited.
pub struct MqttResultSink {
    client: Client,
    prefix: String,
    qos: QoS,
}

impl MqttResultSink {
    pub fn new(client: Client, prefix: impl Into<String>, qos: QoS) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            qos,
        }
    }
}

impl ResultSink for MqttResultSink {
    fn append(&self, path: &ResultPath, record: &UploadRecord) -> bool {
        let topic = path.topic(&self.prefix);
        let payload = match serde_json::to_vec(record) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode result for {}: {}", topic, e);
                return false;
            }
        };

        match self.client.try_publish(topic.as_str(), self.qos, false, payload) {
            Ok(()) => {
                info!("Queued result upload to {} ({:.3} J)", topic, record.max_energy);
                true
            }
            Err(e) => {
                error!("Failed to upload result to {}: {}", topic, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlailType, GradeLevel};
    use rumqttc::MqttOptions;

    fn record() -> UploadRecord {
        UploadRecord {
            max_energy: 2.5,
            max_angular_velocity: 4.0,
            timestamp: 1,
        }
    }

    #[test]
    fn append_is_queued_without_a_broker() {
        let (client, _connection) = Client::new(MqttOptions::new("sink-test", "localhost", 1883), 10);
        let sink = MqttResultSink::new(client, "measurements", QoS::AtLeastOnce);
        let path = ResultPath::new(GradeLevel::Elementary, FlailType::Infantry);
        assert!(sink.append(&path, &record()));
    }

    #[test]
    fn append_fails_once_event_loop_is_gone() {
        let (client, connection) = Client::new(MqttOptions::new("sink-test", "localhost", 1883), 10);
        drop(connection);
        let sink = MqttResultSink::new(client, "measurements", QoS::AtLeastOnce);
        let path = ResultPath::new(GradeLevel::Secondary, FlailType::Cavalry);
        assert!(!sink.append(&path, &record()));
    }
}
