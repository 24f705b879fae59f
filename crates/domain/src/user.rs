use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// How a notification reaches a `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    Sms,
}

impl Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
        }
    }
}

#[derive(Error, Debug)]
pub enum InvalidDeliveryChannelError {
    #[error("Delivery channel: {0} is not known")]
    Unknown(String),
}

impl FromStr for DeliveryChannel {
    type Err = InvalidDeliveryChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            _ => Err(InvalidDeliveryChannelError::Unknown(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: ID,
    pub account_id: ID,
    pub email: String,
    pub phone: Option<String>,
    pub channel: DeliveryChannel,
    pub address: Option<String>,
}

impl User {
    pub fn new(account_id: ID, email: String) -> Self {
        Self {
            id: Default::default(),
            account_id,
            email,
            phone: None,
            channel: DeliveryChannel::Email,
            address: None,
        }
    }

    /// The address a notification for this user should be sent to, `None`
    /// when the chosen channel has no usable endpoint.
    pub fn recipient(&self) -> Option<String> {
        match self.channel {
            DeliveryChannel::Email => Some(self.email.clone()),
            DeliveryChannel::Sms => self.phone.clone(),
        }
    }
}

impl Entity for User {
    fn id(&self) -> &ID {
        &self.id
    }
}
