pub mod auth;
pub mod patient;
pub mod shared;
pub mod upload;
