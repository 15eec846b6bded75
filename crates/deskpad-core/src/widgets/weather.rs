//! Daily forecast for a city, looked up through a [`WeatherProvider`].
//!
//! Lookups never fail the caller: a missing city or a failed request is
//! reported through the notifier and the previous report stays on screen.

use std::fmt::Debug;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::surface::{Frame, Level};

pub const WEATHER_REGION: &str = "weather";
pub const DEFAULT_CITY: &str = "New York";
pub const FORECAST_DAYS: usize = 5;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DAILY_FIELDS: &str = "weathercode,temperature_2m_max,temperature_2m_min";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("no match for city {0:?}")]
    CityNotFound(String),
    #[error("weather request failed: {0}")]
    Request(String),
    #[error("malformed weather response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Column-oriented daily forecast as Open-Meteo returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyForecast {
    pub time: Vec<NaiveDate>,
    pub weathercode: Vec<i64>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub code: i64,
    pub max: f64,
    pub min: f64,
}

impl DailyForecast {
    /// Rows zipped from the columns; a short column ends the list.
    pub fn days(&self) -> Vec<DayForecast> {
        self.time
            .iter()
            .zip(&self.weathercode)
            .zip(self.temperature_2m_max.iter().zip(&self.temperature_2m_min))
            .map(|((date, code), (max, min))| DayForecast {
                date: *date,
                code: *code,
                max: *max,
                min: *min,
            })
            .collect()
    }
}

pub trait WeatherProvider: Debug {
    /// Where the user is, when the provider can tell.
    fn current_position(&self) -> Option<(f64, f64)> {
        None
    }

    fn geocode(&self, city: &str) -> Result<Location, WeatherError>;

    fn forecast(&self, latitude: f64, longitude: f64) -> Result<DailyForecast, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyForecast,
}

/// Blocking client for the public Open-Meteo endpoints.
#[derive(Debug)]
pub struct OpenMeteo {
    agent: ureq::Agent,
}

impl OpenMeteo {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        Self { agent }
    }
}

impl Default for OpenMeteo {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherProvider for OpenMeteo {
    fn geocode(&self, city: &str) -> Result<Location, WeatherError> {
        let response: GeocodingResponse = self
            .agent
            .get(GEOCODING_URL)
            .query("name", city)
            .query("count", "1")
            .query("language", "en")
            .query("format", "json")
            .call()
            .map_err(|e| WeatherError::Request(e.to_string()))?
            .into_json()
            .map_err(|e| WeatherError::Decode(e.to_string()))?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(city.to_string()))
    }

    fn forecast(&self, latitude: f64, longitude: f64) -> Result<DailyForecast, WeatherError> {
        let response: ForecastResponse = self
            .agent
            .get(FORECAST_URL)
            .query("latitude", &latitude.to_string())
            .query("longitude", &longitude.to_string())
            .query("daily", DAILY_FIELDS)
            .query("timezone", "auto")
            .call()
            .map_err(|e| WeatherError::Request(e.to_string()))?
            .into_json()
            .map_err(|e| WeatherError::Decode(e.to_string()))?;
        Ok(response.daily)
    }
}

/// Icon and label for a WMO weather code.
pub fn describe(code: i64) -> (&'static str, &'static str) {
    match code {
        0 => ("☀️", "Sunny"),
        1 => ("🌤️", "Partly cloudy"),
        2 => ("⛅", "Cloudy"),
        3 => ("☁️", "Overcast"),
        45 | 48 => ("🌫️", "Fog"),
        51 | 53 | 55 => ("🌦️", "Drizzle"),
        61 | 63 | 65 => ("🌧️", "Rain"),
        71 | 73 | 75 => ("🌨️", "Snow"),
        80 => ("🌦️", "Showers"),
        81 => ("🌧️", "Showers"),
        95 => ("⛈️", "Storm"),
        99 => ("🌩️", "Storm"),
        _ => ("❓", "Unknown"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: Option<Location>,
    pub today: DayForecast,
    pub upcoming: Vec<DayForecast>,
}

impl WeatherReport {
    fn from_forecast(location: Option<Location>, forecast: &DailyForecast) -> Option<Self> {
        let mut days = forecast.days().into_iter();
        let today = days.next()?;
        Some(Self {
            location,
            today,
            upcoming: days.take(FORECAST_DAYS).collect(),
        })
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(location) = &self.location {
            match &location.country {
                Some(country) => lines.push(format!("📍 {}, {country}", location.name)),
                None => lines.push(format!("📍 {}", location.name)),
            }
        }
        let (icon, text) = describe(self.today.code);
        lines.push(format!("{icon} {text}"));
        lines.push(format!("{:.1}° / {:.1}°", self.today.max, self.today.min));
        for day in &self.upcoming {
            let (icon, text) = describe(day.code);
            lines.push(format!(
                "{} {icon} {:.0}° {text}",
                day.date.format("%a"),
                day.max
            ));
        }
        lines
    }
}

#[derive(Debug)]
pub struct Weather {
    services: Services,
    provider: Box<dyn WeatherProvider>,
    default_city: String,
    report: Option<WeatherReport>,
}

impl Weather {
    pub fn new(services: Services, provider: Box<dyn WeatherProvider>, default_city: &str) -> Self {
        let default_city = match default_city.trim() {
            "" => DEFAULT_CITY.to_string(),
            city => city.to_string(),
        };
        Self {
            services,
            provider,
            default_city,
            report: None,
        }
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
    }

    /// Geocodes `city` and loads its forecast. `Ok(false)` means the lookup
    /// failed and the user was told.
    #[instrument(skip(self))]
    pub fn load_city(&mut self, city: &str) -> WidgetResult<bool> {
        let city = city.trim();
        if city.is_empty() {
            return self.services.reject(ValidationError::EmptyCity);
        }
        let location = match self.provider.geocode(city) {
            Ok(location) => location,
            Err(err) => {
                warn!(error = %err, "geocoding failed");
                self.services.notify(Level::Error, "City not found");
                return Ok(false);
            }
        };
        debug!(name = %location.name, lat = location.latitude, lon = location.longitude, "geocoded");
        let (latitude, longitude) = (location.latitude, location.longitude);
        Ok(self.load_coords(Some(location), latitude, longitude))
    }

    /// Forecast for the current position, or for the default city when the
    /// position is unknown.
    pub fn load_here(&mut self) -> bool {
        match self.provider.current_position() {
            Some((latitude, longitude)) => self.load_coords(None, latitude, longitude),
            None => {
                let city = self.default_city.clone();
                self.load_city(&city).unwrap_or(false)
            }
        }
    }

    pub fn render(&self) -> Frame {
        let frame = match &self.report {
            Some(report) => Frame::Lines(report.lines()),
            None => Frame::Empty("No weather loaded".to_string()),
        };
        self.services.view.draw(WEATHER_REGION, &frame);
        frame
    }

    fn load_coords(&mut self, location: Option<Location>, latitude: f64, longitude: f64) -> bool {
        let report = self
            .provider
            .forecast(latitude, longitude)
            .map_err(|err| err.to_string())
            .and_then(|forecast| {
                WeatherReport::from_forecast(location, &forecast)
                    .ok_or_else(|| "forecast has no days".to_string())
            });
        match report {
            Ok(report) => {
                info!(days = report.upcoming.len() + 1, "weather loaded");
                self.report = Some(report);
                self.render();
                self.services
                    .notify(Level::Success, "Weather loaded successfully");
                true
            }
            Err(err) => {
                warn!(error = %err, "forecast failed");
                self.services
                    .notify(Level::Error, "Unable to fetch weather data");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{DailyForecast, Location, Weather, WeatherError, WeatherProvider, describe};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::surface::Level;

    #[derive(Debug, Default)]
    struct FakeProvider {
        position: Option<(f64, f64)>,
        fail_forecast: bool,
    }

    impl WeatherProvider for FakeProvider {
        fn current_position(&self) -> Option<(f64, f64)> {
            self.position
        }

        fn geocode(&self, city: &str) -> Result<Location, WeatherError> {
            match city {
                "New York" | "Paris" => Ok(Location {
                    name: city.to_string(),
                    country: Some("Somewhere".to_string()),
                    latitude: 1.0,
                    longitude: 2.0,
                }),
                other => Err(WeatherError::CityNotFound(other.to_string())),
            }
        }

        fn forecast(&self, _lat: f64, _lon: f64) -> Result<DailyForecast, WeatherError> {
            if self.fail_forecast {
                return Err(WeatherError::Request("offline".to_string()));
            }
            let start = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
            Ok(DailyForecast {
                time: (0..7).map(|i| start + Duration::days(i)).collect(),
                weathercode: vec![0, 61, 3, 71, 95, 42, 2],
                temperature_2m_max: vec![21.04, 18.0, 17.0, 2.0, 25.0, 20.0, 19.0],
                temperature_2m_min: vec![12.0, 10.0, 9.0, -3.0, 15.0, 11.0, 10.0],
            })
        }
    }

    fn weather(h: &Harness, provider: FakeProvider) -> Weather {
        Weather::new(h.services.clone(), Box::new(provider), "")
    }

    #[test]
    fn city_forecast_shows_today_and_five_days() {
        let h = Harness::new();
        let mut weather = weather(&h, FakeProvider::default());

        assert_eq!(weather.load_city("Paris"), Ok(true));

        let report = weather.report().expect("report");
        assert_eq!(report.upcoming.len(), 5);
        let lines = report.lines();
        assert_eq!(lines[0], "📍 Paris, Somewhere");
        assert_eq!(lines[1], "☀️ Sunny");
        assert_eq!(lines[2], "21.0° / 12.0°");
        assert_eq!(lines[3], "Sun 🌧️ 18° Rain");
        assert_eq!(lines[7], "Thu ❓ 20° Unknown");
        assert_eq!(h.last_message().as_deref(), Some("Weather loaded successfully"));
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let h = Harness::new();
        let mut weather = weather(&h, FakeProvider::default());
        assert_eq!(weather.load_city("Atlantis"), Ok(false));
        assert_eq!(h.notifier.last(), Some((Level::Error, "City not found".to_string())));
        assert_eq!(weather.load_city("  "), Err(ValidationError::EmptyCity));

        let mut offline = super::Weather::new(
            h.services.clone(),
            Box::new(FakeProvider {
                position: None,
                fail_forecast: true,
            }),
            "Paris",
        );
        assert!(!offline.load_here());
        assert_eq!(h.last_message().as_deref(), Some("Unable to fetch weather data"));
        assert!(offline.report().is_none());
    }

    #[test]
    fn here_falls_back_to_default_city() {
        let h = Harness::new();
        let mut weather = weather(&h, FakeProvider::default());
        assert!(weather.load_here());
        assert_eq!(
            weather
                .report()
                .and_then(|r| r.location.as_ref())
                .map(|l| l.name.as_str()),
            Some("New York")
        );

        let mut located = self::weather(
            &h,
            FakeProvider {
                position: Some((40.7, -74.0)),
                fail_forecast: false,
            },
        );
        assert!(located.load_here());
        assert_eq!(located.report().map(|r| r.location.is_none()), Some(true));
    }

    #[test]
    fn weather_codes() {
        assert_eq!(describe(0), ("☀️", "Sunny"));
        assert_eq!(describe(48), ("🌫️", "Fog"));
        assert_eq!(describe(81), ("🌧️", "Showers"));
        assert_eq!(describe(99), ("🌩️", "Storm"));
        assert_eq!(describe(7), ("❓", "Unknown"));
    }
}
