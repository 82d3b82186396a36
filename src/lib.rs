//! Landable: template authoring, publishing and revision history served
//! through an authenticated, version-negotiated JSON API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod publishing;
pub mod render;
pub mod slug;

pub use error::{LandableError, Result};

/// API version assumed when a request does not ask for a specific one.
pub const API_VERSION: u32 = 1;
