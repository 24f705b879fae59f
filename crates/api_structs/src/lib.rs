mod account;
mod delivery;
mod event;
mod rating;
mod status;
mod user;

pub mod dtos {
    pub use crate::account::dtos::*;
    pub use crate::delivery::dtos::*;
    pub use crate::event::dtos::*;
    pub use crate::rating::dtos::*;
    pub use crate::user::dtos::*;
}

pub use crate::account::api::*;
pub use crate::delivery::api::*;
pub use crate::event::api::*;
pub use crate::rating::api::*;
pub use crate::status::api::*;
pub use crate::user::api::*;
