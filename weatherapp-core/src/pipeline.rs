//! The refresh cycle: location fix in, cached and rendered weather out.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    cache::WeatherCache,
    client::WeatherClient,
    error::RefreshError,
    model::{Coordinates, Units, WeatherRecord},
    platform::{
        Connectivity, LocationProvider, Notice, PermissionResponse, PermissionStatus, Priority,
        UserSurface,
    },
    presenter::{Presenter, ScreenState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    CheckingLocationEnabled,
    RequestingPermission,
    AwaitingFix,
    Fetching,
    Done(Outcome),
}

/// Host capabilities the pipeline depends on.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub location: Arc<dyn LocationProvider>,
    pub connectivity: Arc<dyn Connectivity>,
    pub surface: Arc<dyn UserSurface>,
}

/// Drives one screen's worth of weather.
///
/// Cycles are not serialized against each other: two overlapping refreshes
/// both write the cache and the later write wins. Each write is a complete
/// record, so the slot is never left half-updated.
#[derive(Debug)]
pub struct RefreshPipeline {
    client: Arc<dyn WeatherClient>,
    cache: WeatherCache,
    host: Collaborators,
    presenter: Presenter,
    api_key: String,
    units: Units,
    priority: Priority,
    screen: Mutex<ScreenState>,
    state: watch::Sender<RefreshState>,
}

impl RefreshPipeline {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        cache: WeatherCache,
        host: Collaborators,
        api_key: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(RefreshState::Idle);

        Self {
            client,
            cache,
            host,
            presenter: Presenter::default(),
            api_key: api_key.into(),
            units: Units::Metric,
            priority: Priority::HighAccuracy,
            screen: Mutex::new(ScreenState::default()),
            state,
        }
    }

    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn state(&self) -> RefreshState {
        *self.state.borrow()
    }

    /// Observe state transitions, e.g. to drive a progress indicator.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    pub fn screen(&self) -> ScreenState {
        self.screen.lock().clone()
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// App-start entry: show what is cached, then refresh.
    pub async fn start(&self) -> Result<WeatherRecord, RefreshError> {
        self.render_cached().await;
        self.refresh().await
    }

    /// Manual refresh gesture. Re-enters at the location check.
    pub async fn pull_to_refresh(&self) -> Result<WeatherRecord, RefreshError> {
        tracing::info!("Manual refresh requested");
        self.refresh().await
    }

    /// Renders the cached record, if any, onto the screen.
    pub async fn render_cached(&self) {
        let record = self.cache.load();
        let screen = {
            let mut screen = self.screen.lock();
            self.presenter.present(&mut screen, record.as_ref());
            screen.clone()
        };

        if record.is_some() {
            self.host.surface.render(&screen).await;
        }
    }

    pub async fn refresh(&self) -> Result<WeatherRecord, RefreshError> {
        self.transition(RefreshState::CheckingLocationEnabled);

        if !self.host.location.is_location_source_enabled().await {
            self.host.surface.show_notice(Notice::TurnOnLocation).await;
            return self.finish(Err(RefreshError::LocationDisabled));
        }

        if self.host.location.permission_status().await != PermissionStatus::Granted {
            self.transition(RefreshState::RequestingPermission);

            match self.host.location.request_permission().await {
                PermissionResponse::Granted => {}
                PermissionResponse::Denied {
                    show_rationale: true,
                } => {
                    self.explain_permission().await;
                    return self.finish(Err(RefreshError::PermissionDenied {
                        rationale_shown: true,
                    }));
                }
                PermissionResponse::Denied {
                    show_rationale: false,
                } => {
                    tracing::info!("Location permission denied");
                    self.transition(RefreshState::Idle);
                    return Err(RefreshError::PermissionDenied {
                        rationale_shown: false,
                    });
                }
            }
        }

        self.transition(RefreshState::AwaitingFix);
        let mut subscription = self
            .host
            .location
            .request_location_updates(self.priority)
            .await;

        let Some(fix) = subscription.next_fix().await else {
            subscription.cancel();
            tracing::warn!("Location updates ended without a fix");
            return self.finish(Err(RefreshError::NoFix));
        };

        let result = self.fetch_and_store(fix.coords).await;
        subscription.cancel();

        self.finish(result)
    }

    async fn explain_permission(&self) {
        if !self.host.surface.prompt_settings_redirect().await {
            return;
        }
        if let Err(err) = self.host.surface.open_app_settings().await {
            tracing::warn!(error = %err, "Could not open application settings");
        }
    }

    async fn fetch_and_store(&self, coords: Coordinates) -> Result<WeatherRecord, RefreshError> {
        self.transition(RefreshState::Fetching);

        if !self.host.connectivity.is_network_available() {
            self.host.surface.show_notice(Notice::NoInternet).await;
            return Err(RefreshError::NetworkUnavailable);
        }

        self.host.surface.set_busy(true).await;

        let result = match self.client.fetch(coords, self.units, &self.api_key).await {
            Ok(record) => self.store(record).await,
            Err(err) => {
                tracing::error!(error = %err, "Weather fetch failed");
                Err(RefreshError::FetchFailed(err))
            }
        };

        self.host.surface.set_busy(false).await;
        result
    }

    async fn store(&self, record: WeatherRecord) -> Result<WeatherRecord, RefreshError> {
        if let Err(err) = self.cache.save(&record) {
            tracing::error!(error = %err, "Could not store weather");
            return Err(RefreshError::CacheWrite(err));
        }

        tracing::info!(
            location = %record.location_name,
            temperature = record.temperature.current,
            "Weather updated"
        );

        self.render_cached().await;
        Ok(record)
    }

    fn finish(
        &self,
        result: Result<WeatherRecord, RefreshError>,
    ) -> Result<WeatherRecord, RefreshError> {
        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        self.transition(RefreshState::Done(outcome));
        result
    }

    fn transition(&self, next: RefreshState) {
        tracing::debug!(from = ?self.state(), to = ?next, "Refresh state");
        self.state.send_replace(next);
    }
}
