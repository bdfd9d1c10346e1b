//! vidpreview HTTP service
//!
//! Exposes the metadata query endpoints and the host hook endpoints that drive
//! the upload and post interceptors.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
