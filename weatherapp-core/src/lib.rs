//! Core library for the `weatherapp` client.
//!
//! This crate defines:
//! - The cached weather record and the HTTP client that fetches it
//! - A single-slot cache on top of a key-value persistence port
//! - The refresh pipeline (location, permission, connectivity, fetch)
//! - The presenter turning a record into display strings
//!
//! Platform capabilities (location, connectivity, the screen itself) are
//! traits in [`platform`]; hosts such as `weatherapp-cli` implement them.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod platform;
pub mod presenter;
pub mod store;

pub use cache::WeatherCache;
pub use client::{OpenWeatherClient, WeatherClient, client_from_config};
pub use config::Config;
pub use error::{NetworkError, RefreshError};
pub use model::{Condition, Coordinates, Sys, Temperature, Units, WeatherRecord, Wind};
pub use pipeline::{Collaborators, Outcome, RefreshPipeline, RefreshState};
pub use presenter::{DisplayContext, IconKey, Presenter, ScreenState};
pub use store::{FileStore, KeyValueStore, MemoryStore};
