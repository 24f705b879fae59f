use crate::shared::entity::ID;
use serde::Serialize;
use thiserror::Error;

/// Mean earth radius in meters, the same sphere the geography backend
/// uses for non-spheroid distance checks.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidGeoPoint {
    #[error("Latitude: {0} is outside the valid range [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude: {0} is outside the valid range [-180, 180]")]
    InvalidLongitude(f64),
}

/// A validated WGS84 coordinate. Every point that enters the system goes
/// through `GeoPoint::new`, so downstream code never sees NaN or
/// out-of-range coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidGeoPoint> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidGeoPoint::InvalidLatitude(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidGeoPoint::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance in meters on the mean-earth-radius sphere
    /// (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

/// The last known position of a `User`. At most one per user, owned by
/// the geo index.
#[derive(Debug, Clone, PartialEq)]
pub struct UserLocation {
    pub user_id: ID,
    pub point: GeoPoint,
    pub updated: i64,
}
