//! HTTP API handlers for vigil-guard

pub mod frames;
pub mod health;

pub use frames::frame_routes;
pub use health::health_routes;
