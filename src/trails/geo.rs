use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Coordinates as clients send them: `[[lat, lon], ...]` or flat `[lat, lon, ...]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Nested(Vec<Vec<f64>>),
    Flat(Vec<f64>),
}

impl Default for CoordinateInput {
    fn default() -> Self {
        CoordinateInput::Flat(Vec::new())
    }
}

impl CoordinateInput {
    pub fn points(&self) -> Vec<LatLon> {
        match self {
            CoordinateInput::Nested(pairs) => pairs
                .iter()
                .filter(|p| p.len() >= 2)
                .map(|p| LatLon { lat: p[0], lon: p[1] })
                .collect(),
            CoordinateInput::Flat(values) => points_from_flat(values),
        }
    }
}

/// Pairs up a flat `[lat, lon, lat, lon, ...]` array; a dangling value is dropped.
pub fn points_from_flat(values: &[f64]) -> Vec<LatLon> {
    values
        .chunks_exact(2)
        .map(|c| LatLon { lat: c[0], lon: c[1] })
        .collect()
}

pub fn flatten(points: &[LatLon]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.lat, p.lon]).collect()
}

pub fn is_valid(point: &LatLon) -> bool {
    (-90.0..=90.0).contains(&point.lat) && (-180.0..=180.0).contains(&point.lon)
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Keeps the first point, then every point where the distance walked since
/// the previous sample reaches `km_between`. Each sample carries the distance
/// along the track at which it was taken.
pub fn sample_along(points: &[LatLon], km_between: f64) -> Vec<(f64, LatLon)> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut sampled = vec![(0.0, *first)];
    let mut walked = 0.0;
    let mut dist_accum = 0.0;
    for pair in points.windows(2) {
        let step = haversine_km(pair[0], pair[1]);
        walked += step;
        dist_accum += step;
        if dist_accum >= km_between {
            sampled.push((walked, pair[1]));
            dist_accum = 0.0;
        }
    }
    sampled
}

pub fn sample_coordinates(points: &[LatLon], km_between: f64) -> Vec<LatLon> {
    sample_along(points, km_between)
        .into_iter()
        .map(|(_, point)| point)
        .collect()
}

pub fn path_length_km(points: &[LatLon]) -> f64 {
    points.windows(2).map(|p| haversine_km(p[0], p[1])).sum()
}
