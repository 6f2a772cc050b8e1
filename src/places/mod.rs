//! Nearby mental-health places: a thin proxy over the Overpass API
//! that filters, dedupes and distance-sorts the raw results.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

const MENTAL_HEALTH_KEYWORDS: &[&str] = &[
    "mental",
    "psy",
    "psic",
    "counsel",
    "salud mental",
    "psiquiatr",
    "psicolog",
];

#[derive(Debug, thiserror::Error)]
pub enum NearbyError {
    /// Overpass answered with a non-success status
    #[error("Overpass error: {0}")]
    Overpass(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    pub id: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    // Ways and relations carry their coordinates here
    #[serde(default)]
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

impl OverpassElement {
    fn coords(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => self.center.as_ref().map(|c| (c.lat, c.lon)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub opening: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Meters from the query point
    pub distance: f64,
}

fn overpass_query(lat: f64, lon: f64, radius: u32) -> String {
    format!(
        "[out:json][timeout:25];(\
node(around:{radius},{lat},{lon})[\"amenity\"~\"clinic|hospital|doctors|social_facility|healthcare\"];\
way(around:{radius},{lat},{lon})[\"amenity\"~\"clinic|hospital|doctors|social_facility|healthcare\"];\
relation(around:{radius},{lat},{lon})[\"amenity\"~\"clinic|hospital|doctors|social_facility|healthcare\"];\
);out center tags;"
    )
}

/// Query Overpass for health-related places around a point and run
/// the result pipeline: keyword filter, dedupe, distance sort.
pub async fn search_nearby(
    api_url: &str,
    lat: f64,
    lon: f64,
    radius: u32,
) -> Result<Vec<Place>, NearbyError> {
    let query = overpass_query(lat, lon, radius);
    let response = reqwest::Client::new()
        .post(api_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(format!("data={}", urlencoding::encode(&query)))
        .send()
        .await?;

    if !response.status().is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(NearbyError::Overpass(detail));
    }

    let parsed: OverpassResponse = response.json().await?;
    Ok(collect_places(parsed.elements, lat, lon))
}

fn is_mental_health_related(tags: &HashMap<String, String>) -> bool {
    let get = |key: &str| tags.get(key).map(String::as_str).unwrap_or("");
    let text = format!(
        "{} {} {} {} {}",
        get("name"),
        get("amenity"),
        get("healthcare"),
        get("servicetype"),
        get("description"),
    )
    .to_lowercase();
    MENTAL_HEALTH_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Pure result pipeline over raw Overpass elements: keep named,
/// located, mental-health-related places, dedupe by name+address
/// keeping the first, then sort nearest-first from the query point.
pub fn collect_places(elements: Vec<OverpassElement>, lat: f64, lon: f64) -> Vec<Place> {
    let mut seen = HashSet::new();
    let mut places = Vec::new();

    for element in elements {
        let name = element.tags.get("name").cloned().unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let Some((place_lat, place_lon)) = element.coords() else {
            continue;
        };
        if !is_mental_health_related(&element.tags) {
            continue;
        }

        let address = ["addr:street", "addr:housenumber", "addr:city"]
            .iter()
            .filter_map(|key| element.tags.get(*key))
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if !seen.insert(format!("{}||{}", name, address)) {
            continue;
        }

        let phone = element
            .tags
            .get("phone")
            .or_else(|| element.tags.get("contact:phone"))
            .or_else(|| element.tags.get("telephone"))
            .cloned();

        places.push(Place {
            id: element.id,
            name,
            address,
            phone,
            opening: element.tags.get("opening_hours").cloned(),
            lat: place_lat,
            lon: place_lon,
            distance: haversine_distance(lat, lon, place_lat, place_lon),
        });
    }

    places.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    places
}

/// Great-circle distance in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}
