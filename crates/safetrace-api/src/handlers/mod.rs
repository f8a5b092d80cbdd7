//! Per-resource axum handlers.

pub mod admin;
pub mod alerts;
pub mod contacts;
pub mod events;
pub mod locations;
pub mod profile;
pub mod public;
