use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub radius_ft: Option<f64>,
    #[serde(default)]
    pub samples: Option<i64>,
    #[serde(default = "default_crs")]
    pub crs: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub plot_id: Option<String>,
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointResponse {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleResponse {
    pub plot_id: String,
    pub crs: String,
    pub radius_ft: f64,
    pub points: Vec<PointResponse>,
    pub execution_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
