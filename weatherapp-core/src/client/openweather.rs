use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::{
    error::NetworkError,
    model::{Coordinates, Units, WeatherRecord},
};

use super::WeatherClient;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/";

/// Current-weather client for the OpenWeather `weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: Url,
    http: Client,
}

#[derive(Debug, Default)]
pub struct OpenWeatherClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl OpenWeatherClientBuilder {
    pub fn base_url(mut self, base_url: Option<&str>) -> Self {
        self.base_url = base_url.map(str::to_owned);
        self
    }

    /// No timeout is applied unless one is set here.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenWeatherClient> {
        let raw = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        // `Url::join` replaces the last path segment unless the base ends in '/'.
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };

        let base_url = Url::parse(&normalized)
            .with_context(|| format!("Invalid weather service base URL: {raw}"))?;

        let mut http = Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build().context("Failed to build HTTP client")?;

        Ok(OpenWeatherClient { base_url, http })
    }
}

impl OpenWeatherClient {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> OpenWeatherClientBuilder {
        OpenWeatherClientBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self) -> Url {
        // "weather" is a valid relative reference, so the join cannot fail.
        self.base_url
            .join("weather")
            .unwrap_or_else(|_| self.base_url.clone())
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch(
        &self,
        coords: Coordinates,
        units: Units,
        api_key: &str,
    ) -> Result<WeatherRecord, NetworkError> {
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();

        let res = self
            .http
            .get(self.endpoint())
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", units.as_str()),
                ("appid", api_key),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(NetworkError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let record: WeatherRecord = serde_json::from_str(&body)?;

        tracing::debug!(
            location = %record.location_name,
            conditions = record.conditions.len(),
            "Received current weather"
        );

        Ok(record)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_weather_path() {
        let client = OpenWeatherClient::builder()
            .base_url(Some("https://example.test/data/2.5"))
            .build()
            .expect("valid url");

        assert_eq!(
            client.endpoint().as_str(),
            "https://example.test/data/2.5/weather"
        );
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_body_cuts_on_char_boundary() {
        let long = "é".repeat(300);
        let cut = truncate_body(&long);

        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
    }
}
