//! Capabilities the refresh pipeline borrows from its host.
//!
//! None of these are implemented here beyond test doubles; a host (the
//! terminal binary, a mobile shell, ...) provides the real ones.

use async_trait::async_trait;
use std::fmt::{self, Debug};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{model::Coordinates, presenter::ScreenState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    HighAccuracy,
    BalancedPowerAccuracy,
    LowPower,
    NoPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    NotGranted,
}

/// What the user answered to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    Granted,
    /// `show_rationale` is the platform's hint that an explanation should
    /// be offered before asking again.
    Denied { show_rationale: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coords: Coordinates,
    pub accuracy_meters: Option<f64>,
}

impl LocationFix {
    pub fn new(coords: Coordinates) -> Self {
        Self {
            coords,
            accuracy_meters: None,
        }
    }
}

/// Consumer side of a location update stream.
///
/// Cancelling (explicitly or by dropping the handle) tells the producer to
/// stop delivering updates.
pub struct LocationSubscription {
    fixes: mpsc::Receiver<LocationFix>,
    cancel: CancellationToken,
}

/// Producer side handed to whatever delivers location updates.
#[derive(Debug, Clone)]
pub struct LocationUpdates {
    fixes: mpsc::Sender<LocationFix>,
    cancel: CancellationToken,
}

impl LocationSubscription {
    pub fn channel() -> (LocationUpdates, LocationSubscription) {
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        (
            LocationUpdates {
                fixes: tx,
                cancel: cancel.clone(),
            },
            LocationSubscription { fixes: rx, cancel },
        )
    }

    /// Waits for the next fix; `None` once the producer is gone or the
    /// subscription was cancelled.
    pub async fn next_fix(&mut self) -> Option<LocationFix> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            fix = self.fixes.recv() => fix,
        }
    }

    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.fixes.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Debug for LocationSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationSubscription")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl LocationUpdates {
    /// Delivers a fix; returns `false` once the subscriber has gone away.
    pub async fn send(&self, fix: LocationFix) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.fixes.send(fix).await.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the subscriber releases the subscription.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// True when any location source (satellite or network-assisted) is on.
    async fn is_location_source_enabled(&self) -> bool;

    async fn permission_status(&self) -> PermissionStatus;

    async fn request_permission(&self) -> PermissionResponse;

    async fn request_location_updates(&self, priority: Priority) -> LocationSubscription;
}

pub trait Connectivity: Send + Sync + Debug {
    fn is_network_available(&self) -> bool;
}

/// Short-lived messages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    TurnOnLocation,
    NoInternet,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::TurnOnLocation => "Please turn on location",
            Notice::NoInternet => "No Internet Connection",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The screen the pipeline reports to.
#[async_trait]
pub trait UserSurface: Send + Sync + Debug {
    async fn show_notice(&self, notice: Notice);

    /// Shows the "Permission required" prompt. Returns `true` when the user
    /// picked "Go to Settings".
    async fn prompt_settings_redirect(&self) -> bool;

    /// Opens the system settings page for this application.
    async fn open_app_settings(&self) -> anyhow::Result<()>;

    /// Shows or hides the blocking progress indicator.
    async fn set_busy(&self, busy: bool);

    async fn render(&self, screen: &ScreenState);
}
