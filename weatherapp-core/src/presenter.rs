use chrono::{DateTime, FixedOffset, Local, TimeZone};

use crate::model::WeatherRecord;

/// Regions whose users expect a Fahrenheit label.
const FAHRENHEIT_REGIONS: [&str; 3] = ["US", "LR", "MM"];

/// Locale variables consulted in order of precedence.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKey {
    Sun,
    Cloud,
    Rain,
    Storm,
    Snowflake,
}

impl IconKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::Sun => "sunny",
            IconKey::Cloud => "cloud",
            IconKey::Rain => "rain",
            IconKey::Storm => "storm",
            IconKey::Snowflake => "snowflake",
        }
    }
}

/// Maps a service icon code to the icon shown on screen.
///
/// Codes outside the table yield `None`, and the caller keeps whatever icon
/// it displayed before.
pub fn icon_for_code(code: &str) -> Option<IconKey> {
    match code {
        "01d" => Some(IconKey::Sun),
        "02d" | "03d" | "04d" | "04n" | "01n" | "02n" | "03n" | "10n" | "50d" => {
            Some(IconKey::Cloud)
        }
        "10d" | "11n" => Some(IconKey::Rain),
        "11d" => Some(IconKey::Storm),
        "13d" | "13n" => Some(IconKey::Snowflake),
        _ => None,
    }
}

/// Unit glyph for a region code. The value is always Celsius; only the
/// label changes.
pub fn unit_label(region: Option<&str>) -> &'static str {
    match region {
        Some(r) if FAHRENHEIT_REGIONS.contains(&r) => "°F",
        _ => "°C",
    }
}

/// Epoch seconds as 24-hour `HH:MM` at the given offset.
pub fn unix_time(secs: i64, offset: &FixedOffset) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.with_timezone(offset).format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Epoch seconds as 24-hour `HH:MM` in the system time zone, using the
/// offset in force at that instant.
pub fn local_time(secs: i64) -> String {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

pub fn degree_to_compass(deg: f64) -> &'static str {
    let deg = deg.rem_euclid(360.0);
    let idx = (deg / 22.5 + 0.5) as usize % COMPASS.len();
    COMPASS[idx]
}

/// Formats like `12.0` / `12.5`: whole numbers keep one fractional digit.
fn fmt_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Region code of a POSIX locale name such as `en_US.UTF-8`.
fn parse_region(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next()?;
    let region = base.split(['_', '-']).nth(1)?;

    let valid = (region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()))
        || (region.len() == 3 && region.chars().all(|c| c.is_ascii_digit()));

    valid.then(|| region.to_ascii_uppercase())
}

/// Locale and clock settings that shape rendered strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayContext {
    /// Region of the primary locale, when the host can enumerate locales.
    pub region: Option<String>,
    /// Fixed clock offset. `None` follows the system time zone per timestamp.
    pub offset: Option<FixedOffset>,
}

impl DisplayContext {
    pub fn new(region: Option<&str>, offset: FixedOffset) -> Self {
        Self {
            region: region.map(str::to_ascii_uppercase),
            offset: Some(offset),
        }
    }

    /// `HH:MM` for an epoch timestamp under this context's clock.
    pub fn clock(&self, secs: i64) -> String {
        match &self.offset {
            Some(offset) => unix_time(secs, offset),
            None => local_time(secs),
        }
    }

    pub fn from_environment() -> Self {
        let locale = LOCALE_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty());

        Self {
            region: locale.as_deref().and_then(parse_region),
            ..Self::default()
        }
    }
}

/// Everything the screen shows. `None` fields have never been rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenState {
    pub main: Option<String>,
    pub description: Option<String>,
    pub icon: Option<IconKey>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub location_name: Option<String>,
    pub country: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

impl ScreenState {
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Presenter {
    context: DisplayContext,
}

impl Presenter {
    pub fn new(context: DisplayContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &DisplayContext {
        &self.context
    }

    /// Writes `record` onto `screen`. Without a record the screen is left
    /// as it was.
    pub fn present(&self, screen: &mut ScreenState, record: Option<&WeatherRecord>) {
        let Some(record) = record else {
            return;
        };

        if let Some(condition) = record.primary_condition() {
            screen.main = Some(condition.main.clone());
            screen.description = Some(condition.description.clone());
            if let Some(icon) = icon_for_code(&condition.icon) {
                screen.icon = Some(icon);
            }
        }

        let unit = unit_label(self.context.region.as_deref());
        let temp = &record.temperature;

        screen.temperature = Some(format!("{}{unit}", fmt_number(temp.current)));
        screen.humidity = Some(format!("{}%", temp.humidity));
        screen.min = Some(format!("{} min", fmt_number(temp.min)));
        screen.max = Some(format!("{} max", fmt_number(temp.max)));
        screen.wind_speed = Some(fmt_number(record.wind.speed));
        screen.wind_direction = Some(degree_to_compass(record.wind.direction).to_string());
        screen.location_name = Some(record.location_name.clone());
        screen.country = Some(record.sys.country.clone());
        screen.sunrise = Some(self.context.clock(record.sys.sunrise));
        screen.sunset = Some(self.context.clock(record.sys.sunset));
    }
}
