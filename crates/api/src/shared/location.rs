use crate::error::VicinityError;
use vicinity_domain::GeoPoint;
use vicinity_infra::{GeocodeError, VicinityContext};

/// Where a request positioned something: either an explicit coordinate
/// pair or an address for the geocoder.
#[derive(Debug, Clone)]
pub struct PositionInput {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum PositionError {
    /// Neither a coordinate pair nor an address was given
    Missing,
    InvalidPoint(String),
    AddressNotFound(String),
    GeocoderUnavailable(String),
}

impl PositionInput {
    pub fn provided(&self) -> bool {
        self.lat.is_some() || self.lng.is_some() || self.address.is_some()
    }

    /// An explicit coordinate pair wins over an address. The address is
    /// only sent to the geocoder when no pair is given.
    pub async fn resolve(&self, ctx: &VicinityContext) -> Result<GeoPoint, PositionError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                GeoPoint::new(lat, lng).map_err(|e| PositionError::InvalidPoint(e.to_string()))
            }
            (None, None) => match &self.address {
                Some(address) => ctx.geocoder.geocode(address).await.map_err(|e| match e {
                    GeocodeError::NotFound(_) => PositionError::AddressNotFound(e.to_string()),
                    GeocodeError::Api(_) | GeocodeError::Http(_) => {
                        PositionError::GeocoderUnavailable(e.to_string())
                    }
                }),
                None => Err(PositionError::Missing),
            },
            _ => Err(PositionError::InvalidPoint(
                "Both lat and lng must be provided together".into(),
            )),
        }
    }
}

impl From<PositionError> for VicinityError {
    fn from(e: PositionError) -> Self {
        match e {
            PositionError::Missing => Self::BadClientData(
                "A position is required, either lat and lng or an address".into(),
            ),
            PositionError::InvalidPoint(reason) => Self::BadClientData(reason),
            PositionError::AddressNotFound(reason) => Self::BadClientData(reason),
            PositionError::GeocoderUnavailable(reason) => Self::ServiceUnavailable(reason),
        }
    }
}
