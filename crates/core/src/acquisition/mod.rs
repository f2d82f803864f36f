//! Acquisition system abstraction.
//!
//! This module provides an `AcquisitionClient` trait for the external service
//! that locates and downloads albums (Lidarr), plus its HTTP implementation.

mod lidarr;
mod types;

pub use lidarr::LidarrClient;
pub use types::*;
