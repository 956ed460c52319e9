use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::trails::geo::{self, CoordinateInput, LatLon};

pub const MAX_DISTANCE_M: f64 = 1_000_000.0;
pub const MAX_ELEVATION_GAIN_M: f64 = 50_000.0;

/// One uploaded hike. Coordinates are stored as a flat lat/lon array.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrailData {
    pub id: i32,
    pub user_id: String,
    pub coordinates: Vec<f64>,
    pub distance_meters: f64,
    pub elevation_gain_meters: f64,
    pub trail_conditions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TrailData {
    pub fn points(&self) -> Vec<LatLon> {
        geo::points_from_flat(&self.coordinates)
    }

    pub fn start(&self) -> Option<LatLon> {
        self.points().first().copied()
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    /// One-paragraph summary used as model context.
    pub fn summary(&self) -> String {
        let conditions = if self.trail_conditions.is_empty() {
            "none reported".to_string()
        } else {
            self.trail_conditions.join(", ")
        };
        let start = self
            .start()
            .map(|p| format!("{:.4}, {:.4}", p.lat, p.lon))
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Distance: {:.1} km; Elevation gain: {:.0} m; Trail conditions: {}; Start point: {} ({} points total)",
            self.distance_km(),
            self.elevation_gain_meters,
            conditions,
            start,
            self.coordinates.len() / 2
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct TrailDataInput {
    #[serde(default)]
    pub coordinates: CoordinateInput,
    #[serde(default)]
    pub distance_meters: f64,
    #[serde(default)]
    pub elevation_gain_meters: f64,
    #[serde(default)]
    pub trail_conditions: Vec<String>,
}

/// Input after validation: normalized coordinates and cleaned tags.
#[derive(Debug, PartialEq)]
pub struct ValidTrail {
    pub coordinates: Vec<f64>,
    pub distance_meters: f64,
    pub elevation_gain_meters: f64,
    pub trail_conditions: Vec<String>,
}

impl TrailDataInput {
    pub fn validate(self) -> Result<ValidTrail, String> {
        if !self.distance_meters.is_finite() || self.distance_meters < 0.0 {
            return Err("distance_meters must be a non-negative number".into());
        }
        if !self.elevation_gain_meters.is_finite() || self.elevation_gain_meters < 0.0 {
            return Err("elevation_gain_meters must be a non-negative number".into());
        }
        if self.elevation_gain_meters > MAX_ELEVATION_GAIN_M {
            return Err("elevation_gain_meters is too large".into());
        }
        let points = self.coordinates.points();
        if points.iter().any(|p| !geo::is_valid(p)) {
            return Err("coordinates out of range".into());
        }

        let mut trail_conditions: Vec<String> = Vec::new();
        for tag in self.trail_conditions {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !trail_conditions.contains(&tag) {
                trail_conditions.push(tag);
            }
        }

        // Clients that only send a track get the measured length.
        let distance_meters = if self.distance_meters == 0.0 && points.len() > 1 {
            geo::path_length_km(&points) * 1000.0
        } else {
            self.distance_meters
        };
        if distance_meters > MAX_DISTANCE_M {
            return Err("distance_meters must be at most 1000 km".into());
        }

        Ok(ValidTrail {
            coordinates: geo::flatten(&points),
            distance_meters,
            elevation_gain_meters: self.elevation_gain_meters,
            trail_conditions,
        })
    }
}
