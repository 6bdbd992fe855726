use crate::{
    Config,
    error::NetworkError,
    model::{Coordinates, Units, WeatherRecord},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Fetches current weather for a coordinate pair.
///
/// There is no retry: one failed call ends the refresh cycle it belongs to.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(
        &self,
        coords: Coordinates,
        units: Units,
        api_key: &str,
    ) -> Result<WeatherRecord, NetworkError>;
}

/// Construct the HTTP client described by `config`.
pub fn client_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    OpenWeatherClient::builder()
        .base_url(config.base_url.as_deref())
        .timeout(config.request_timeout())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn client_from_default_config_uses_public_endpoint() {
        let client = client_from_config(&Config::default()).expect("default config builds");
        assert_eq!(client.base_url().as_str(), openweather::DEFAULT_BASE_URL);
    }

    #[test]
    fn client_from_config_honours_base_url() {
        let cfg = Config {
            base_url: Some("http://127.0.0.1:9999/api".into()),
            request_timeout_secs: Some(5),
            ..Config::default()
        };

        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(5)));

        let client = client_from_config(&cfg).expect("custom base url builds");
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9999/api/");
    }

    #[test]
    fn client_from_config_rejects_garbage_url() {
        let cfg = Config {
            base_url: Some("not a url".into()),
            ..Config::default()
        };

        let err = client_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Invalid weather service base URL"));
    }
}
