//! Terminal implementations of the platform capabilities.

use anyhow::anyhow;
use async_trait::async_trait;
use std::{
    net::{SocketAddr, TcpStream},
    path::PathBuf,
    time::Duration,
};

use weatherapp_core::{
    Coordinates, OpenWeatherClient, ScreenState,
    platform::{
        Connectivity, LocationFix, LocationProvider, LocationSubscription, Notice,
        PermissionResponse, PermissionStatus, Priority, UserSurface,
    },
};

/// Location source reporting one configured position.
///
/// With no position configured it behaves like a device whose location
/// services are switched off.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    coords: Option<Coordinates>,
}

impl FixedLocation {
    pub fn new(coords: Option<Coordinates>) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn is_location_source_enabled(&self) -> bool {
        self.coords.is_some()
    }

    // A terminal process needs no runtime grant to read its own config.
    async fn permission_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_permission(&self) -> PermissionResponse {
        PermissionResponse::Granted
    }

    async fn request_location_updates(&self, priority: Priority) -> LocationSubscription {
        let (updates, subscription) = LocationSubscription::channel();
        let coords = self.coords;

        tokio::spawn(async move {
            if let Some(coords) = coords {
                tracing::debug!(?priority, ?coords, "Delivering location fix");
                updates.send(LocationFix::new(coords)).await;
            }
            updates.cancelled().await;
            tracing::debug!("Location subscription released");
        });

        subscription
    }
}

/// Reachability check: can we open a TCP connection to the weather host?
///
/// Addresses are resolved once up front, so the synchronous check never
/// waits on DNS and only spends a short connect timeout per address.
#[derive(Debug, Clone)]
pub struct TcpConnectivity {
    addrs: Vec<SocketAddr>,
    timeout: Duration,
}

impl TcpConnectivity {
    /// Addresses tried per check, in resolver order.
    const MAX_ADDRS: usize = 2;

    pub fn new(addrs: Vec<SocketAddr>) -> Self {
        Self {
            addrs,
            timeout: Duration::from_millis(500),
        }
    }

    /// Resolves the host that serves `client`. A failed lookup yields a
    /// checker that always reports the network as unavailable.
    pub async fn for_client(client: &OpenWeatherClient) -> anyhow::Result<Self> {
        let (host, port) = service_endpoint(client)?;

        let addrs = match tokio::net::lookup_host((host.as_str(), port)).await {
            Ok(addrs) => addrs.take(Self::MAX_ADDRS).collect(),
            Err(err) => {
                tracing::debug!(%host, error = %err, "Host lookup failed");
                Vec::new()
            }
        };

        Ok(Self::new(addrs))
    }
}

fn service_endpoint(client: &OpenWeatherClient) -> anyhow::Result<(String, u16)> {
    let url = client.base_url();
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Weather service URL has no host: {url}"))?;
    let port = url.port_or_known_default().unwrap_or(443);

    Ok((host.to_string(), port))
}

impl Connectivity for TcpConnectivity {
    fn is_network_available(&self) -> bool {
        self.addrs
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, self.timeout).is_ok())
    }
}

/// Prints notices and the rendered screen to the terminal.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    settings_path: PathBuf,
}

impl TerminalSurface {
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }
}

#[async_trait]
impl UserSurface for TerminalSurface {
    async fn show_notice(&self, notice: Notice) {
        eprintln!("{notice}");
    }

    async fn prompt_settings_redirect(&self) -> bool {
        let answer = tokio::task::spawn_blocking(|| {
            inquire::Confirm::new("Permission required. Go to Settings?")
                .with_default(false)
                .prompt()
        })
        .await;

        matches!(answer, Ok(Ok(true)))
    }

    async fn open_app_settings(&self) -> anyhow::Result<()> {
        let path = self.settings_path.display();
        println!("Settings live in {path}");
        println!("Edit them with `weatherapp configure`.");
        Ok(())
    }

    async fn set_busy(&self, busy: bool) {
        if busy {
            eprintln!("Fetching weather...");
        }
    }

    async fn render(&self, screen: &ScreenState) {
        println!("{}", format_screen(screen));
    }
}

pub fn format_screen(screen: &ScreenState) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str(&format!(
        "{}, {}\n",
        field(&screen.location_name),
        field(&screen.country)
    ));
    out.push_str(&format!(
        "  {} ({}){}\n",
        field(&screen.main),
        field(&screen.description),
        screen
            .icon
            .map(|icon| format!(" [{}]", icon.as_str()))
            .unwrap_or_default()
    ));
    out.push_str(&format!(
        "  Temperature  {}  ({} / {})\n",
        field(&screen.temperature),
        field(&screen.min),
        field(&screen.max)
    ));
    out.push_str(&format!("  Humidity     {}\n", field(&screen.humidity)));
    out.push_str(&format!(
        "  Wind         {} {}\n",
        field(&screen.wind_speed),
        field(&screen.wind_direction)
    ));
    out.push_str(&format!(
        "  Sunrise      {}\n  Sunset       {}",
        field(&screen.sunrise),
        field(&screen.sunset)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weatherapp_core::IconKey;

    #[test]
    fn endpoint_follows_client_base_url() {
        let default = OpenWeatherClient::new().unwrap();
        assert_eq!(
            service_endpoint(&default).unwrap(),
            ("api.openweathermap.org".to_string(), 443)
        );

        let local = OpenWeatherClient::builder()
            .base_url(Some("http://127.0.0.1:8080/api"))
            .build()
            .unwrap();
        assert_eq!(
            service_endpoint(&local).unwrap(),
            ("127.0.0.1".to_string(), 8080)
        );
    }

    #[tokio::test]
    async fn listening_host_is_reachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = OpenWeatherClient::builder()
            .base_url(Some(&format!("http://127.0.0.1:{port}/")))
            .build()
            .unwrap();
        let connectivity = TcpConnectivity::for_client(&client).await.unwrap();

        assert_eq!(connectivity.addrs, vec![listener.local_addr().unwrap()]);
        assert!(connectivity.is_network_available());
    }

    #[test]
    fn unresolved_host_is_unreachable_without_lookup() {
        assert!(!TcpConnectivity::new(Vec::new()).is_network_available());
    }

    #[test]
    fn format_screen_fills_missing_fields() {
        let screen = ScreenState {
            location_name: Some("Paris".into()),
            humidity: Some("55%".into()),
            icon: Some(IconKey::Rain),
            ..ScreenState::default()
        };

        let text = format_screen(&screen);
        assert!(text.starts_with("Paris, -"));
        assert!(text.contains("Humidity     55%"));
        assert!(text.contains("[rain]"));
    }

    #[tokio::test]
    async fn fixed_location_without_coordinates_is_disabled() {
        assert!(!FixedLocation::new(None).is_location_source_enabled().await);
    }

    #[tokio::test]
    async fn fixed_location_delivers_one_fix() {
        let coords = Coordinates::new(59.33, 18.07);
        let location = FixedLocation::new(Some(coords));

        let mut sub = location.request_location_updates(Priority::HighAccuracy).await;
        let fix = sub.next_fix().await.expect("fix delivered");

        assert_eq!(fix.coords, coords);
        sub.cancel();
    }
}
