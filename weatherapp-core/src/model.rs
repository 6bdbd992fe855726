use serde::{Deserialize, Serialize};

/// A position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Unit system requested from the weather service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Temperatures in Celsius (metric mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(rename = "temp")]
    pub current: f64,
    #[serde(rename = "temp_min")]
    pub min: f64,
    #[serde(rename = "temp_max")]
    pub max: f64,
    pub humidity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    /// Meteorological direction in degrees.
    #[serde(rename = "deg")]
    pub direction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    /// ISO 3166 two-letter country code.
    pub country: String,
    /// Epoch seconds, UTC.
    pub sunrise: i64,
    /// Epoch seconds, UTC.
    pub sunset: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Current weather at one place, as returned by the weather service.
///
/// The serialized form is the service's own JSON document, so a cached
/// record and a fresh response body are interchangeable. A refresh builds a
/// new record and replaces the cached one; records are never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// The service may report several simultaneous conditions.
    #[serde(rename = "weather")]
    pub conditions: Vec<Condition>,
    #[serde(rename = "main")]
    pub temperature: Temperature,
    pub wind: Wind,
    pub sys: Sys,
    #[serde(rename = "name")]
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coordinates>,
    /// Observation time, epoch seconds.
    #[serde(rename = "dt", default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<i64>,
    /// Shift from UTC of the reported place, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
}

impl WeatherRecord {
    /// The condition that gets displayed; any others are ignored.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }
}
