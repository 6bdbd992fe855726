use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{model::WeatherRecord, store::KeyValueStore};

/// Preference key holding the serialized record.
pub const WEATHER_RESPONSE_KEY: &str = "weather_response_data";

/// Single-slot cache of the last successful response.
///
/// The slot is either empty or holds one complete record; `save` replaces
/// the whole value in a single store write.
#[derive(Debug, Clone)]
pub struct WeatherCache {
    store: Arc<dyn KeyValueStore>,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, record: &WeatherRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize weather record")?;
        self.store.put(WEATHER_RESPONSE_KEY, &json)
    }

    /// The cached record, or `None` when nothing usable is stored.
    pub fn load(&self) -> Option<WeatherRecord> {
        let raw = match self.store.get(WEATHER_RESPONSE_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "Could not read cached weather");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring undecodable cached weather");
                None
            }
        }
    }
}
