pub mod assets;
pub mod auth;
pub mod patient;
pub mod upload;
