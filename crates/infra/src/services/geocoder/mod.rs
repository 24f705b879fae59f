use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use vicinity_domain::GeoPoint;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Address: {0} could not be resolved to a location")]
    NotFound(String),
    #[error("Geocoding API rejected the request: {0}")]
    Api(String),
    #[error("Geocoding request failed: {0}")]
    Http(String),
}

/// Resolves a free text address to a coordinate.
#[async_trait::async_trait]
pub trait IGeocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}

const GEOCODE_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct GoogleMapsGeocoder {
    client: Client,
    api_key: String,
}

impl GoogleMapsGeocoder {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("To build geocoding http client");
        Self { client, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[async_trait::async_trait]
impl IGeocoder for GoogleMapsGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let res = self
            .client
            .get(GEOCODE_API_URL)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!("Geocoding request for address: {} failed: {:?}", address, e);
                GeocodeError::Http(e.to_string())
            })?;
        let res: GeocodeResponse = res.json().await.map_err(|e| {
            warn!(
                "Geocoding response for address: {} was malformed: {:?}",
                address, e
            );
            GeocodeError::Http(e.to_string())
        })?;

        match res.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeError::NotFound(address.to_string())),
            status => {
                let reason = res.error_message.unwrap_or_else(|| status.to_string());
                warn!("Geocoding API rejected address: {}: {}", address, reason);
                return Err(GeocodeError::Api(reason));
            }
        }

        let location = res
            .results
            .first()
            .map(|result| &result.geometry.location)
            .ok_or_else(|| GeocodeError::NotFound(address.to_string()))?;
        GeoPoint::new(location.lat, location.lng).map_err(|e| GeocodeError::Api(e.to_string()))
    }
}

/// Geocoder for development and tests. Resolves only addresses that were
/// registered up front.
pub struct InMemoryGeocoder {
    addresses: Mutex<HashMap<String, GeoPoint>>,
}

impl InMemoryGeocoder {
    pub fn new() -> Self {
        Self {
            addresses: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, address: &str, point: GeoPoint) {
        self.addresses
            .lock()
            .unwrap()
            .insert(address.to_string(), point);
    }
}

#[async_trait::async_trait]
impl IGeocoder for InMemoryGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        self.addresses
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .ok_or_else(|| GeocodeError::NotFound(address.to_string()))
    }
}
