//! Public types for the nearby places API
use serde::Deserialize;

#[derive(Deserialize)]
pub struct NearbyParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Search radius in meters
    pub radius: Option<u32>,
}
