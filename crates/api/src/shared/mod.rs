pub mod auth;
pub mod location;
pub mod retry;
pub mod usecase;
