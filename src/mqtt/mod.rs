pub mod client;
pub mod sink;

pub use client::{connect, qos_from_level, run_mqtt_feed};
pub use sink::MqttResultSink;
