use serde::{Deserialize, Serialize};
use vicinity_domain::{DeliveryChannel, User, UserLocation, ID};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    pub id: ID,
    pub account_id: ID,
    pub email: String,
    pub phone: Option<String>,
    pub channel: DeliveryChannel,
    pub address: Option<String>,
}

impl UserDTO {
    pub fn new(user: User) -> Self {
        Self {
            id: user.id.clone(),
            account_id: user.account_id.clone(),
            email: user.email,
            phone: user.phone,
            channel: user.channel,
            address: user.address,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationDTO {
    pub user_id: ID,
    pub lat: f64,
    pub lng: f64,
    pub updated: i64,
}

impl UserLocationDTO {
    pub fn new(location: UserLocation) -> Self {
        Self {
            user_id: location.user_id.clone(),
            lat: location.point.lat(),
            lng: location.point.lng(),
            updated: location.updated,
        }
    }
}
