//! # Vigil Common Library
//!
//! Shared code for the Vigil services:
//! - Triple-set naming and annotation format (alert artifacts on disk)
//! - Data root layout (alert directory and dataset partitions)
//! - Configuration loading
//! - Event types and EventBus
//! - SSE helpers
//! - Filesystem utilities

pub mod config;
pub mod error;
pub mod events;
pub mod fs_utils;
pub mod layout;
pub mod sse;
pub mod triple;

pub use error::{Error, Result};
pub use layout::DataLayout;
pub use triple::{AlertStatus, BoundingBox, Detection, TripleSet};
