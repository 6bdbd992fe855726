use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use weatherapp_core::{
    Collaborators, Config, Coordinates, DisplayContext, FileStore, Presenter, RefreshPipeline,
    ScreenState, WeatherCache, client_from_config,
};

use crate::host::{FixedLocation, TcpConnectivity, TerminalSurface, format_screen};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherapp", version, about = "Current weather for where you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and an optional default location.
    Configure,

    /// Show the last fetched weather without touching the network.
    Show,

    /// Fetch current weather, cache it and show it.
    Refresh {
        /// Latitude in degrees; overrides the configured location.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in degrees; overrides the configured location.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show => show(),
            Command::Refresh { lat, lon } => {
                let coords = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
                refresh(coords).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    cfg.set_api_key(api_key.trim().to_string());

    let set_location = inquire::Confirm::new("Set a default location?")
        .with_default(cfg.location.is_none())
        .prompt()
        .context("Failed to read answer")?;

    if set_location {
        let latitude = inquire::CustomType::<f64>::new("Latitude:")
            .with_error_message("Enter a number of degrees, e.g. 59.33")
            .prompt()
            .context("Failed to read latitude")?;
        let longitude = inquire::CustomType::<f64>::new("Longitude:")
            .with_error_message("Enter a number of degrees, e.g. 18.07")
            .prompt()
            .context("Failed to read longitude")?;
        cfg.location = Some(Coordinates::new(latitude, longitude));
    }

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn show() -> anyhow::Result<()> {
    let cache = WeatherCache::new(Arc::new(FileStore::in_data_dir()?));
    let presenter = Presenter::new(DisplayContext::from_environment());

    let mut screen = ScreenState::default();
    presenter.present(&mut screen, cache.load().as_ref());

    if screen.is_blank() {
        println!("No weather cached yet. Run `weatherapp refresh` first.");
    } else {
        println!("{}", format_screen(&screen));
    }
    Ok(())
}

async fn refresh(coords: Option<Coordinates>) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let api_key = cfg.api_key()?;

    let client = client_from_config(&cfg)?;
    let connectivity = TcpConnectivity::for_client(&client).await?;

    let host = Collaborators {
        location: Arc::new(FixedLocation::new(coords.or(cfg.location))),
        connectivity: Arc::new(connectivity),
        surface: Arc::new(TerminalSurface::new(Config::config_file_path()?)),
    };

    let cache = WeatherCache::new(Arc::new(FileStore::in_data_dir()?));
    let pipeline = RefreshPipeline::new(Arc::new(client), cache, host, api_key)
        .with_presenter(Presenter::new(DisplayContext::from_environment()));

    if let Err(err) = pipeline.refresh().await {
        // User-visible failures were already shown; the rest only goes to the log.
        tracing::debug!(error = %err, "Refresh finished without new weather");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["weatherapp", "refresh", "--lat", "-33.86", "--lon", "151.2"])
            .expect("valid args");

        match cli.command {
            Command::Refresh { lat, lon } => {
                assert_eq!(lat, Some(-33.86));
                assert_eq!(lon, Some(151.2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn refresh_requires_both_coordinates() {
        let err = Cli::try_parse_from(["weatherapp", "refresh", "--lat", "10"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn refresh_without_coordinates_uses_config() {
        let cli = Cli::try_parse_from(["weatherapp", "refresh"]).expect("valid args");
        assert!(matches!(cli.command, Command::Refresh { lat: None, lon: None }));
    }
}
