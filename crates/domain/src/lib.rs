mod account;
mod event;
mod geo;
mod plan;
mod queue;
mod rating;
mod shared;
mod user;

pub use account::{Account, AccountSettings, AccountWebhookSettings};
pub use event::Event;
pub use geo::{GeoPoint, InvalidGeoPoint, UserLocation, EARTH_RADIUS_METERS};
pub use plan::{PlanEntry, PlanEntryStatus};
pub use queue::{DeadLetter, NotificationMessage, QueueEntry};
pub use rating::{Rating, RatingSummary};
pub use shared::entity::{Entity, ID};
pub use user::{DeliveryChannel, User};
