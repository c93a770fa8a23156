use serde::{Deserialize, Serialize};

use super::TimestampedSample;

/// A saved free-recording session. Serialized as JSON into the key-value store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub name: String,
    #[serde(rename = "data")]
    pub raw_samples: Vec<TimestampedSample>,
    pub max_acceleration: f64,
    pub timestamp: i64,
}

impl SessionRecord {
    pub fn new(name: String, raw_samples: Vec<TimestampedSample>, max_acceleration: f64, timestamp: i64) -> Self {
        Self {
            name,
            raw_samples,
            max_acceleration,
            timestamp,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.raw_samples.len()
    }
}
