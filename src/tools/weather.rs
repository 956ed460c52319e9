use serde::Deserialize;
use tracing::warn;

use crate::tools::ToolError;
use crate::trails::geo::{self, LatLon};
use crate::trails::models::TrailData;

const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const SAMPLE_EVERY_KM: f64 = 5.0;
const MAX_POINTS: usize = 5;
const COLD_BELOW_C: f64 = 5.0;
const HOT_ABOVE_C: f64 = 28.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl WeatherArgs {
    pub fn location(&self) -> Option<LatLon> {
        Some(LatLon {
            lat: self.latitude?,
            lon: self.longitude?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    #[serde(default)]
    weather: Vec<OwmCondition>,
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub condition: String,
    pub description: String,
    pub temp_c: f64,
    pub wind_ms: Option<f64>,
}

impl WeatherReport {
    fn from_owm(resp: OwmResponse) -> Self {
        let first = resp.weather.into_iter().next();
        WeatherReport {
            condition: first.as_ref().map(|w| w.main.clone()).unwrap_or_default(),
            description: first
                .map(|w| w.description)
                .unwrap_or_else(|| "no description".to_string()),
            temp_c: resp.main.temp,
            wind_ms: resp.wind.map(|w| w.speed),
        }
    }

    pub fn is_wet(&self) -> bool {
        let text = format!("{} {}", self.condition, self.description).to_lowercase();
        ["rain", "drizzle", "thunder", "shower"]
            .iter()
            .any(|w| text.contains(w))
    }
}

pub async fn fetch_current(
    http: &reqwest::Client,
    api_key: &str,
    point: LatLon,
) -> Result<WeatherReport, ToolError> {
    let resp = http
        .get(OPENWEATHER_URL)
        .query(&[
            ("lat", point.lat.to_string()),
            ("lon", point.lon.to_string()),
            ("appid", api_key.to_string()),
            ("units", "metric".to_string()),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ToolError::Api { status, body });
    }
    Ok(WeatherReport::from_owm(resp.json::<OwmResponse>().await?))
}

/// Where to check: an explicit location wins, otherwise samples along the trail.
pub fn weather_points(location: Option<LatLon>, trail: Option<&TrailData>) -> Vec<(String, LatLon)> {
    if let Some(point) = location {
        return vec![("Your location".to_string(), point)];
    }
    let Some(trail) = trail else {
        return Vec::new();
    };
    geo::sample_along(&trail.points(), SAMPLE_EVERY_KM)
        .into_iter()
        .take(MAX_POINTS)
        .enumerate()
        .map(|(i, (walked_km, p))| {
            let label = if i == 0 {
                "Start".to_string()
            } else {
                format!("~{walked_km:.0} km")
            };
            (label, p)
        })
        .collect()
}

pub fn advisories(reports: &[WeatherReport]) -> Vec<&'static str> {
    let mut advice = Vec::new();
    if reports.iter().any(WeatherReport::is_wet) {
        advice.push("🌧️ Rain expected: pack a waterproof jacket and watch for slippery sections.");
    }
    if reports.iter().any(|r| r.temp_c < COLD_BELOW_C) {
        advice.push("🥶 Cold conditions: bring warm layers, gloves and a hat.");
    }
    if reports.iter().any(|r| r.temp_c > HOT_ABOVE_C) {
        advice.push("🥵 Hot conditions: carry extra water, wear sun protection and avoid the midday heat.");
    }
    if advice.is_empty() && !reports.is_empty() {
        advice.push("✅ Conditions look good for hiking.");
    }
    advice
}

fn format_report(label: &str, point: LatLon, report: &WeatherReport) -> String {
    let wind = report
        .wind_ms
        .map(|w| format!(", wind {w:.1} m/s"))
        .unwrap_or_default();
    format!(
        "• {label} ({:.4}, {:.4}): {}, {:.1}°C{wind}",
        point.lat, point.lon, report.description, report.temp_c
    )
}

pub async fn weather_tool(
    http: &reqwest::Client,
    api_key: Option<&str>,
    points: &[(String, LatLon)],
) -> String {
    let Some(api_key) = api_key else {
        return "Weather lookups are not available right now. Check a local forecast before you head out."
            .to_string();
    };
    if points.is_empty() {
        return "Share your location or upload a trail so I can check the weather along your route."
            .to_string();
    }

    let mut lines = Vec::new();
    let mut reports = Vec::new();
    for (label, point) in points {
        match fetch_current(http, api_key, *point).await {
            Ok(report) => {
                lines.push(format_report(label, *point, &report));
                reports.push(report);
            }
            Err(err) => {
                warn!(error = %err, lat = point.lat, lon = point.lon, "Weather lookup failed");
                lines.push(format!("• {label}: weather unavailable"));
            }
        }
    }

    if reports.is_empty() {
        return "I couldn't fetch the weather right now. Please try again in a few minutes.".to_string();
    }

    format!(
        "🌤️ Current weather along your route:\n{}\n\n{}",
        lines.join("\n"),
        advisories(&reports).join("\n")
    )
}
