use crate::dtos::{UserDTO, UserLocationDTO};
use serde::{Deserialize, Serialize};
use vicinity_domain::{DeliveryChannel, User, UserLocation, ID};

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user: UserDTO,
}

impl UserResponse {
    pub fn new(user: User) -> Self {
        Self {
            user: UserDTO::new(user),
        }
    }
}

pub mod create_user {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub email: String,
        #[serde(default)]
        pub phone: Option<String>,
        #[serde(default)]
        pub channel: Option<DeliveryChannel>,
        #[serde(default)]
        pub address: Option<String>,
        #[serde(default)]
        pub lat: Option<f64>,
        #[serde(default)]
        pub lng: Option<f64>,
    }

    pub type APIResponse = UserResponse;
}

pub mod get_user {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub user_id: ID,
    }

    pub type APIResponse = UserResponse;
}

pub mod update_user_location {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub user_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[serde(default)]
        pub lat: Option<f64>,
        #[serde(default)]
        pub lng: Option<f64>,
        #[serde(default)]
        pub address: Option<String>,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub location: UserLocationDTO,
    }

    impl APIResponse {
        pub fn new(location: UserLocation) -> Self {
            Self {
                location: UserLocationDTO::new(location),
            }
        }
    }
}

pub mod delete_user {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub user_id: ID,
    }

    pub type APIResponse = UserResponse;
}
