pub mod auth;
pub mod calendar;
pub mod config;
pub mod goals;
pub mod members;
pub mod resources;
