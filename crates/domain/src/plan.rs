use crate::shared::entity::ID;
use crate::user::DeliveryChannel;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// A planned notification for one `(event, user)` pair. The pair is the
/// identity: planning the same event twice can never produce a second
/// entry for the same user.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub event_id: ID,
    pub user_id: ID,
    pub account_id: ID,
    pub channel: DeliveryChannel,
    pub recipient: String,
    /// When the notification becomes due, unix millis.
    pub send_at: i64,
    pub status: PlanEntryStatus,
    pub created: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanEntryStatus {
    Scheduled,
    Cancelled,
    Delivered,
    DeadLettered,
}

impl Display for PlanEntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Delivered => write!(f, "delivered"),
            Self::DeadLettered => write!(f, "dead_lettered"),
        }
    }
}

#[derive(Error, Debug)]
pub enum InvalidPlanEntryStatusError {
    #[error("Plan entry status: {0} is not known")]
    Unknown(String),
}

impl FromStr for PlanEntryStatus {
    type Err = InvalidPlanEntryStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "cancelled" => Ok(Self::Cancelled),
            "delivered" => Ok(Self::Delivered),
            "dead_lettered" => Ok(Self::DeadLettered),
            _ => Err(InvalidPlanEntryStatusError::Unknown(s.to_string())),
        }
    }
}
