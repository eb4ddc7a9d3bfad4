#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for pose operations.
pub mod error;

/// Small fixed-size linear algebra helpers.
pub mod linalg;

/// Batch recentering and rescaling of camera poses.
pub mod normalize;

/// Geometric quality metrics over a set of cameras.
pub mod quality;

/// Conversion from SfM world-to-camera poses to camera-to-world matrices.
pub mod transforms;

pub use error::PoseError;
