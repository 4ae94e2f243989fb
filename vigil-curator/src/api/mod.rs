//! HTTP API handlers for vigil-curator
//!
//! The review UI lists alerts, shows display artifacts from `/artifacts/`,
//! and posts decisions. ARCHIVED, CONFIRMED and DISMISSED alerts are terminal.

pub mod alerts;
pub mod buildinfo;
pub mod health;
pub mod sse;
pub mod stats;

pub use alerts::alert_routes;
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use sse::event_stream;
pub use stats::stats_routes;
