use serde::Deserialize;
use tracing::warn;

use crate::tools::ToolError;
use crate::trails::geo::LatLon;

const PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
const SEARCH_KEYWORD: &str = "outdoor gear rental";
pub const DEFAULT_RADIUS_M: u32 = 10_000;
pub const MAX_RADIUS_M: u32 = 50_000;
const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentalArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_m: Option<u32>,
}

impl RentalArgs {
    pub fn radius(&self) -> u32 {
        self.radius_m
            .filter(|r| *r > 0)
            .unwrap_or(DEFAULT_RADIUS_M)
            .min(MAX_RADIUS_M)
    }
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<Place>,
    #[serde(default)]
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
}

pub fn places_url(point: LatLon, radius_m: u32, api_key: &str) -> String {
    format!(
        "{PLACES_URL}?location={},{}&radius={}&keyword={}&key={}",
        point.lat,
        point.lon,
        radius_m,
        urlencoding::encode(SEARCH_KEYWORD),
        urlencoding::encode(api_key)
    )
}

pub async fn search_nearby(
    http: &reqwest::Client,
    api_key: &str,
    point: LatLon,
    radius_m: u32,
) -> Result<Vec<Place>, ToolError> {
    let resp = http.get(places_url(point, radius_m, api_key)).send().await?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ToolError::Api { status, body });
    }

    let body: PlacesResponse = resp.json().await?;
    match body.status.as_str() {
        "OK" | "ZERO_RESULTS" => Ok(body.results.into_iter().take(MAX_RESULTS).collect()),
        other => Err(ToolError::Api {
            status: 200,
            body: format!("{other}: {}", body.error_message.unwrap_or_default()),
        }),
    }
}

pub fn format_places(places: &[Place], radius_m: u32) -> String {
    if places.is_empty() {
        return format!(
            "I couldn't find any gear rental shops within {:.0} km. Try a larger radius or check outfitters in the nearest town.",
            radius_m as f64 / 1000.0
        );
    }
    let lines: Vec<String> = places
        .iter()
        .enumerate()
        .map(|(i, place)| {
            let mut line = format!("{}. **{}**", i + 1, place.name);
            if let Some(vicinity) = &place.vicinity {
                line.push_str(&format!(", {vicinity}"));
            }
            if let Some(rating) = place.rating {
                match place.user_ratings_total {
                    Some(total) => line.push_str(&format!(" (⭐ {rating:.1}, {total} reviews)")),
                    None => line.push_str(&format!(" (⭐ {rating:.1})")),
                }
            }
            line
        })
        .collect();
    format!("🏪 Gear rental shops near you:\n\n{}", lines.join("\n"))
}

pub async fn gear_rental_tool(
    http: &reqwest::Client,
    api_key: Option<&str>,
    point: Option<LatLon>,
    radius_m: u32,
) -> String {
    let Some(api_key) = api_key else {
        return "Gear rental search isn't available right now. Try searching \"outdoor gear rental\" in your maps app."
            .to_string();
    };
    let Some(point) = point else {
        return "Share your location or upload a trail so I can find rental shops nearby.".to_string();
    };

    match search_nearby(http, api_key, point, radius_m).await {
        Ok(places) => format_places(&places, radius_m),
        Err(err) => {
            warn!(error = %err, "Places search failed");
            "I couldn't search for rental shops right now. Please try again later.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_defaults_and_caps() {
        assert_eq!(RentalArgs::default().radius(), 10_000);
        let big = RentalArgs {
            radius_m: Some(90_000),
            ..Default::default()
        };
        assert_eq!(big.radius(), 50_000);
        let zero = RentalArgs {
            radius_m: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.radius(), 10_000);
    }

    #[test]
    fn url_encodes_keyword() {
        let url = places_url(LatLon { lat: 43.2, lon: 76.9 }, 5000, "abc");
        assert!(url.contains("location=43.2,76.9"));
        assert!(url.contains("radius=5000"));
        assert!(url.contains("keyword=outdoor%20gear%20rental"));
        assert!(url.ends_with("key=abc"));
    }

    #[test]
    fn parses_places_payload() {
        let body = r#"{
            "status": "OK",
            "results": [
                {"name": "Peak Rentals", "vicinity": "12 Main St", "rating": 4.6, "user_ratings_total": 120},
                {"name": "Trail Hub"}
            ]
        }"#;
        let parsed: PlacesResponse = serde_json::from_str(body).unwrap();
        let text = format_places(&parsed.results, 10_000);
        assert!(text.contains("1. **Peak Rentals**, 12 Main St (⭐ 4.6, 120 reviews)"));
        assert!(text.contains("2. **Trail Hub**"));
    }

    #[test]
    fn empty_results_mention_radius() {
        assert!(format_places(&[], 25_000).contains("within 25 km"));
    }

    #[tokio::test]
    async fn missing_location_asks_for_it() {
        let http = reqwest::Client::new();
        let text = gear_rental_tool(&http, Some("key"), None, DEFAULT_RADIUS_M).await;
        assert!(text.starts_with("Share your location"));
        let text = gear_rental_tool(&http, None, None, DEFAULT_RADIUS_M).await;
        assert!(text.contains("isn't available"));
    }
}
